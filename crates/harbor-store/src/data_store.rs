use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{trace, warn};

use harbor_types::StoreType;

use crate::cache::FileContentCache;
use crate::cow::PathLocks;
use crate::error::{StoreError, StoreResult};
use crate::traits::DataStore;

/// File-backed [`DataStore`]: one JSON document per entry, named
/// `<id>.json` inside the store's directory.
pub struct FileDataStore<T> {
    directory: PathBuf,
    locks: Arc<PathLocks>,
    cache: Arc<FileContentCache>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> FileDataStore<T> {
    pub fn new(directory: PathBuf, locks: Arc<PathLocks>, cache: Arc<FileContentCache>) -> Self {
        Self {
            directory,
            locks,
            cache,
            _payload: PhantomData,
        }
    }

    pub(crate) fn directory(&self) -> &PathBuf {
        &self.directory
    }

    pub(crate) fn locks(&self) -> &PathLocks {
        &self.locks
    }

    fn entry_file(&self, id: &str) -> PathBuf {
        self.directory
            .join(format!("{id}.{}", StoreType::Data.extension()))
    }

    /// Paths of all entry files, ignoring foreign suffixes.
    fn entry_files(&self) -> StoreResult<Vec<PathBuf>> {
        let read_dir = match fs::read_dir(&self.directory) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut files = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(StoreType::Data.extension()) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl<T> FileDataStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn read_entry(&self, path: &Path) -> StoreResult<Option<T>> {
        if let Some(cached) = self.cache.get::<T>(path) {
            return Ok(Some((*cached).clone()));
        }
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value: T = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        self.cache.put(path, Arc::new(value.clone()));
        Ok(Some(value))
    }

    fn write_entry(&self, id: &str, value: &T) -> StoreResult<()> {
        let file = self.entry_file(id);
        self.locks.commit(&file, |out| {
            serde_json::to_writer_pretty(out, value)
                .map_err(|err| StoreError::Serialization(err.to_string()))
        })?;
        self.cache.put(&file, Arc::new(value.clone()));
        trace!(id, store = %self.directory.display(), "data entry written");
        Ok(())
    }
}

impl<T> DataStore<T> for FileDataStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn put(&self, value: &T) -> StoreResult<String> {
        loop {
            let id = uuid::Uuid::now_v7().to_string();
            if self.entry_file(&id).exists() {
                continue;
            }
            self.write_entry(&id, value)?;
            return Ok(id);
        }
    }

    fn put_with_id(&self, id: &str, value: &T) -> StoreResult<()> {
        self.write_entry(id, value)
    }

    fn get(&self, id: &str) -> StoreResult<Option<T>> {
        self.read_entry(&self.entry_file(id))
    }

    fn get_all(&self) -> StoreResult<HashMap<String, T>> {
        let mut entries = HashMap::new();
        for path in self.entry_files()? {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_entry(&path) {
                Ok(Some(value)) => {
                    entries.insert(id.to_string(), value);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable data entry");
                }
            }
        }
        Ok(entries)
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        let file = self.entry_file(id);
        self.locks.remove(&file)?;
        self.cache.evict(&file);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        for path in self.entry_files()? {
            self.locks.remove(&path)?;
            self.cache.evict(&path);
        }
        Ok(())
    }
}
