use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::debug;

use harbor_types::RepositoryId;

use crate::check::ReadOnlyCheck;
use crate::error::{GateError, GateResult, ReadOnlyReason};
use crate::status::GateStatusRegistry;

/// Verbs that stay permitted on a read-only repository.
const DEFAULT_SAFE_VERBS: [&str; 2] = ["read", "pull"];

/// Decides whether a mutating operation against a repository is allowed.
///
/// Aggregates the built-in archived and exporting checks (via the
/// [`GateStatusRegistry`]) with any registered custom [`ReadOnlyCheck`]s and
/// the set of read-only-safe verbs. Consulted by every store mutation and by
/// permission grants before they take effect.
pub struct WriteGate {
    registry: Arc<GateStatusRegistry>,
    checks: RwLock<Vec<Box<dyn ReadOnlyCheck>>>,
    safe_verbs: HashSet<String>,
}

impl WriteGate {
    /// A gate with the default read-only-safe verbs (`read`, `pull`).
    pub fn new(registry: Arc<GateStatusRegistry>) -> Self {
        Self::with_safe_verbs(registry, DEFAULT_SAFE_VERBS)
    }

    /// A gate with a custom read-only-safe verb set.
    pub fn with_safe_verbs(
        registry: Arc<GateStatusRegistry>,
        verbs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            registry,
            checks: RwLock::new(Vec::new()),
            safe_verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }

    /// Register an additional read-only check.
    pub fn add_check(&self, check: impl ReadOnlyCheck + 'static) {
        self.checks
            .write()
            .expect("gate lock poisoned")
            .push(Box::new(check));
    }

    /// Why the repository is read-only right now, if it is.
    ///
    /// Built-in checks run first: archived wins over exporting, both win
    /// over custom checks.
    pub fn read_only_reason(&self, id: &RepositoryId) -> Option<ReadOnlyReason> {
        if self.registry.is_archived(id) {
            return Some(ReadOnlyReason::Archived);
        }
        if self.registry.is_exporting(id) {
            return Some(ReadOnlyReason::Exporting);
        }
        let checks = self.checks.read().expect("gate lock poisoned");
        checks.iter().find_map(|check| check.read_only_reason(id))
    }

    pub fn is_read_only(&self, id: &RepositoryId) -> bool {
        self.read_only_reason(id).is_some()
    }

    /// Whether `verb` is forbidden on this repository.
    ///
    /// Read-only-safe verbs are always permitted; everything else is
    /// forbidden while the repository is read-only.
    pub fn is_forbidden(&self, verb: &str, id: &RepositoryId) -> bool {
        if self.safe_verbs.contains(verb) {
            return false;
        }
        self.is_read_only(id)
    }

    /// Fails with [`GateError::ReadOnly`] if the repository must not be
    /// written.
    pub fn check(&self, id: &RepositoryId) -> GateResult<()> {
        match self.read_only_reason(id) {
            Some(reason) => {
                debug!(repository = %id, %reason, "write denied");
                Err(GateError::ReadOnly {
                    repository: id.clone(),
                    reason,
                })
            }
            None => Ok(()),
        }
    }
}
