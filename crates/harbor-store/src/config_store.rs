use std::fs::File;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::cache::FileContentCache;
use crate::cow::PathLocks;
use crate::error::{StoreError, StoreResult};
use crate::traits::ConfigStore;

/// File-backed [`ConfigStore`]: one JSON document at a fixed path.
pub struct FileConfigStore<T> {
    file: PathBuf,
    locks: Arc<PathLocks>,
    cache: Arc<FileContentCache>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> FileConfigStore<T> {
    pub fn new(file: PathBuf, locks: Arc<PathLocks>, cache: Arc<FileContentCache>) -> Self {
        Self {
            file,
            locks,
            cache,
            _payload: PhantomData,
        }
    }

    pub(crate) fn file(&self) -> &PathBuf {
        &self.file
    }

    pub(crate) fn locks(&self) -> &PathLocks {
        &self.locks
    }
}

impl<T> ConfigStore<T> for FileConfigStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn read(&self) -> StoreResult<Option<T>> {
        if let Some(cached) = self.cache.get::<T>(&self.file) {
            trace!(file = %self.file.display(), "config read served from cache");
            return Ok(Some((*cached).clone()));
        }
        let file = match File::open(&self.file) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value: T = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        self.cache.put(&self.file, Arc::new(value.clone()));
        Ok(Some(value))
    }

    fn write(&self, value: &T) -> StoreResult<()> {
        self.locks.commit(&self.file, |out| {
            serde_json::to_writer_pretty(out, value)
                .map_err(|err| StoreError::Serialization(err.to_string()))
        })?;
        self.cache.put(&self.file, Arc::new(value.clone()));
        trace!(file = %self.file.display(), "config written");
        Ok(())
    }

    fn delete(&self) -> StoreResult<()> {
        self.locks.remove(&self.file)?;
        self.cache.evict(&self.file);
        Ok(())
    }
}
