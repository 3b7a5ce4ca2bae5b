//! Copy-on-write file commits.
//!
//! Every durable write in the engine goes through [`PathLocks::commit`]:
//! serialize into a temporary file next to the target, then atomically rename
//! it over the target. A failed serialization discards the temporary file and
//! leaves the target untouched — a partial write is never visible.
//!
//! Writers to the same path serialize on an in-process striped lock. Readers
//! never take the lock: rename is atomic, so a concurrent reader always sees
//! either the previous or the new complete file. The lock plus the atomic
//! rename is what makes an in-process write queue unnecessary — last writer
//! wins, without corruption.

use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{trace, warn};

use crate::error::{StoreError, StoreResult};

const DEFAULT_STRIPES: usize = 64;

/// Striped per-path writer locks.
///
/// Paths hash onto a fixed set of stripes, so the table stays bounded no
/// matter how many files the engine touches. Two distinct paths may share a
/// stripe and serialize needlessly; that costs latency, never correctness.
pub struct PathLocks {
    stripes: Vec<Mutex<()>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::with_stripes(DEFAULT_STRIPES)
    }

    pub fn with_stripes(count: usize) -> Self {
        let stripes = (0..count.max(1)).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    fn stripe_for(&self, path: &Path) -> &Mutex<()> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        path.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        &self.stripes[index]
    }

    /// Run `f` while holding the writer lock for `path`.
    fn locked<R>(&self, path: &Path, f: impl FnOnce() -> R) -> StoreResult<R> {
        trace!(path = %path.display(), "write lock get");
        let guard = self
            .stripe_for(path)
            .lock()
            .map_err(|_| StoreError::Lock(format!("lock poisoned for {}", path.display())))?;
        let result = f();
        drop(guard);
        trace!(path = %path.display(), "write lock released");
        Ok(result)
    }

    /// Atomically replace `target` with content produced by `write`.
    ///
    /// The temporary file is created in the target's directory so the final
    /// rename never crosses a filesystem boundary.
    pub fn commit(
        &self,
        target: &Path,
        write: impl FnOnce(&mut File) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let parent = target.parent().ok_or_else(|| {
            StoreError::Io(std::io::Error::other(
                "target file has no parent directory",
            ))
        })?;
        self.locked(target, || {
            let mut temporary = NamedTempFile::new_in(parent)?;
            if let Err(err) = write(temporary.as_file_mut()) {
                warn!(path = %target.display(), "error writing temporary file");
                // Dropping the NamedTempFile deletes it; the target is untouched.
                return Err(err);
            }
            temporary
                .persist(target)
                .map_err(|err| StoreError::Io(err.error))?;
            Ok(())
        })?
    }

    /// Remove `target` under its writer lock.
    ///
    /// Returns `Ok(false)` if the file did not exist.
    pub fn remove(&self, target: &Path) -> StoreResult<bool> {
        self.locked(target, || match std::fs::remove_file(target) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err)),
        })?
    }
}

impl Default for PathLocks {
    fn default() -> Self {
        Self::new()
    }
}
