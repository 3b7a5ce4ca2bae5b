use harbor_types::RepositoryId;

use crate::error::ReadOnlyReason;

/// A pluggable read-only check.
///
/// The [`crate::WriteGate`] consults every registered check in registration
/// order after its built-in archived and exporting checks; the first one
/// returning a reason denies the write.
pub trait ReadOnlyCheck: Send + Sync {
    /// Returns the reason this repository must not be written, or `None` if
    /// this check permits the write.
    fn read_only_reason(&self, repository: &RepositoryId) -> Option<ReadOnlyReason>;
}

impl<F> ReadOnlyCheck for F
where
    F: Fn(&RepositoryId) -> Option<ReadOnlyReason> + Send + Sync,
{
    fn read_only_reason(&self, repository: &RepositoryId) -> Option<ReadOnlyReason> {
        self(repository)
    }
}
