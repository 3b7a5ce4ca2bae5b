//! The three store abstractions.
//!
//! All implementations share these contracts:
//! - Reading a missing object or entry returns `Ok(None)`, never an error.
//! - Removing a missing entry is a no-op.
//! - Every mutation asks the write gate first and fails with
//!   [`crate::StoreError::ReadOnly`] when the owning repository is gated.
//! - Directory enumeration only ever considers files carrying the store
//!   kind's suffix.

use std::collections::HashMap;

use crate::blob_store::Blob;
use crate::error::StoreResult;

/// A store holding exactly one structured object.
pub trait ConfigStore<T>: Send + Sync {
    /// The stored object, or `None` if nothing has been written yet.
    fn read(&self) -> StoreResult<Option<T>>;

    /// Replace the stored object.
    fn write(&self, value: &T) -> StoreResult<()>;

    /// Remove the stored object. Missing is a no-op.
    fn delete(&self) -> StoreResult<()>;
}

/// A store holding many structured objects, keyed by string id.
pub trait DataStore<T>: Send + Sync {
    /// Store `value` under a generated id and return the id.
    ///
    /// Generated ids are guaranteed unique at generation time; a collision
    /// with an existing entry is retried.
    fn put(&self, value: &T) -> StoreResult<String>;

    /// Store `value` under a caller-chosen id, replacing any existing entry.
    fn put_with_id(&self, id: &str, value: &T) -> StoreResult<()>;

    /// The entry with the given id, or `None`.
    fn get(&self, id: &str) -> StoreResult<Option<T>>;

    /// All entries of the store.
    ///
    /// Entries that fail to deserialize are skipped with a logged warning —
    /// one damaged document must not make the whole store unreadable.
    fn get_all(&self) -> StoreResult<HashMap<String, T>>;

    /// Remove the entry with the given id. Missing is a no-op.
    fn remove(&self, id: &str) -> StoreResult<()>;

    /// Remove every entry of the store.
    fn clear(&self) -> StoreResult<()>;
}

/// A store holding many opaque binary objects.
pub trait BlobStore: Send + Sync {
    /// Create an empty blob under a generated id.
    fn create(&self) -> StoreResult<Blob>;

    /// Create an empty blob under a caller-chosen id.
    ///
    /// Fails with [`crate::StoreError::AlreadyExists`] if the id's file is
    /// already present.
    fn create_with_id(&self, id: &str) -> StoreResult<Blob>;

    /// The blob with the given id, or `None`.
    fn get(&self, id: &str) -> StoreResult<Option<Blob>>;

    /// All blobs of the store.
    fn get_all(&self) -> StoreResult<Vec<Blob>>;

    /// Remove the blob's backing file. Missing is a no-op.
    fn remove(&self, blob: &Blob) -> StoreResult<()>;
}
