use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use harbor_types::StoreType;

use crate::cow::PathLocks;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Handle to one binary object in a blob store.
///
/// A blob is raw bytes in a `<id>.blob` file; content is streamed, never
/// held in memory or cached by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    id: String,
    path: PathBuf,
}

impl Blob {
    fn new(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the blob's content in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// A read stream over the blob's content.
    pub fn reader(&self) -> StoreResult<File> {
        Ok(File::open(&self.path)?)
    }

    /// A write stream replacing the blob's content.
    pub fn writer(&self) -> StoreResult<File> {
        Ok(OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&self.path)?)
    }

    /// Flush hook reserved for buffering implementations; writes through
    /// [`writer`](Self::writer) are already on disk when the stream closes.
    pub fn commit(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// File-backed [`BlobStore`].
pub struct FileBlobStore {
    directory: PathBuf,
    locks: Arc<PathLocks>,
}

impl FileBlobStore {
    pub fn new(directory: PathBuf, locks: Arc<PathLocks>) -> Self {
        Self { directory, locks }
    }

    pub(crate) fn directory(&self) -> &PathBuf {
        &self.directory
    }

    pub(crate) fn locks(&self) -> &PathLocks {
        &self.locks
    }

    fn blob_file(&self, id: &str) -> PathBuf {
        self.directory
            .join(format!("{id}.{}", StoreType::Blob.extension()))
    }
}

impl BlobStore for FileBlobStore {
    fn create(&self) -> StoreResult<Blob> {
        loop {
            let id = uuid::Uuid::now_v7().to_string();
            match self.create_with_id(&id) {
                Ok(blob) => return Ok(blob),
                Err(StoreError::AlreadyExists(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn create_with_id(&self, id: &str) -> StoreResult<Blob> {
        let path = self.blob_file(id);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                trace!(id, store = %self.directory.display(), "blob created");
                Ok(Blob::new(id, path))
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: &str) -> StoreResult<Option<Blob>> {
        let path = self.blob_file(id);
        if path.is_file() {
            Ok(Some(Blob::new(id, path)))
        } else {
            Ok(None)
        }
    }

    fn get_all(&self) -> StoreResult<Vec<Blob>> {
        let read_dir = match fs::read_dir(&self.directory) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut blobs = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(StoreType::Blob.extension()) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                blobs.push(Blob::new(id, path.clone()));
            }
        }
        Ok(blobs)
    }

    fn remove(&self, blob: &Blob) -> StoreResult<()> {
        self.locks.remove(blob.path())?;
        Ok(())
    }
}
