use harbor_types::RepositoryId;

/// Why a repository is currently read-only.
///
/// Callers surface different user-facing messages per reason, so the reason
/// is carried through every gate denial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOnlyReason {
    /// The repository is archived.
    Archived,
    /// The repository is being exported right now.
    Exporting,
    /// A registered [`crate::ReadOnlyCheck`] denied the write.
    Custom(String),
}

impl std::fmt::Display for ReadOnlyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archived => write!(f, "archived"),
            Self::Exporting => write!(f, "currently exporting"),
            Self::Custom(reason) => write!(f, "{reason}"),
        }
    }
}

/// Errors raised by the write gate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// A write was attempted against a read-only repository.
    #[error("repository {repository} is read-only: {reason}")]
    ReadOnly {
        repository: RepositoryId,
        reason: ReadOnlyReason,
    },
}

impl GateError {
    /// The denial reason, for callers that render per-reason messages.
    pub fn reason(&self) -> &ReadOnlyReason {
        match self {
            Self::ReadOnly { reason, .. } => reason,
        }
    }
}

/// Result alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
