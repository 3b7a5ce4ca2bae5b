use harbor_gate::GateError;
use harbor_types::RepositoryId;

/// Errors from store operations.
///
/// Reads of missing entries are not errors — they return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure writing, reading, or deleting an entry. Fatal to the
    /// call, not to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A blob was created with an id whose file already exists, or a
    /// repository location was assigned twice.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// A write was attempted against a gated repository. The inner error
    /// carries whether the repository is archived or exporting.
    #[error(transparent)]
    ReadOnly(#[from] GateError),

    /// The scope cannot be resolved to a physical location. This is a
    /// configuration/integrity error, not an empty store.
    #[error("no location known for repository {0}")]
    LocationNotFound(RepositoryId),

    /// A path lock could not be acquired (poisoned by a panicked writer).
    #[error("lock error: {0}")]
    Lock(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
