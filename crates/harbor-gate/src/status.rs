use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use harbor_events::{EventBus, RepositoryEvent, RepositoryEventKind};
use harbor_types::{Repository, RepositoryId};

/// In-memory gating status of all repositories.
///
/// Holds the set of archived repositories (mirrored from persisted metadata)
/// and the set of repositories currently being exported. Constructed once at
/// startup, seeded from the repository manager, then mutated only through
/// [`handle_repository_event`](Self::handle_repository_event) and the
/// exporting guard. The registry is passed by handle wherever gating status
/// is needed; nothing here is global or static.
pub struct GateStatusRegistry {
    archived: RwLock<HashSet<RepositoryId>>,
    exporting: RwLock<HashSet<RepositoryId>>,
}

impl GateStatusRegistry {
    pub fn new() -> Self {
        Self {
            archived: RwLock::new(HashSet::new()),
            exporting: RwLock::new(HashSet::new()),
        }
    }

    /// Seed the archived set from persisted repository metadata.
    ///
    /// Called once at startup, before the first write can arrive.
    pub fn seed<'a>(&self, repositories: impl IntoIterator<Item = &'a Repository>) {
        let mut archived = self.archived.write().expect("status lock poisoned");
        for repository in repositories {
            if repository.archived {
                archived.insert(repository.id.clone());
            }
        }
        debug!(count = archived.len(), "seeded archived repositories");
    }

    pub fn is_archived(&self, id: &RepositoryId) -> bool {
        self.archived
            .read()
            .expect("status lock poisoned")
            .contains(id)
    }

    pub fn is_exporting(&self, id: &RepositoryId) -> bool {
        self.exporting
            .read()
            .expect("status lock poisoned")
            .contains(id)
    }

    /// Mirror the archived flag from a repository event.
    pub fn handle_repository_event(&self, event: &RepositoryEvent) {
        let mut archived = self.archived.write().expect("status lock poisoned");
        match event.kind {
            RepositoryEventKind::Created | RepositoryEventKind::Modified => {
                if event.repository.archived {
                    archived.insert(event.repository.id.clone());
                } else {
                    archived.remove(&event.repository.id);
                }
            }
            RepositoryEventKind::Deleted => {
                archived.remove(&event.repository.id);
            }
        }
        trace!(
            repository = %event.repository.id,
            archived = event.repository.archived,
            "archived status updated"
        );
    }

    /// Subscribe this registry to repository events on the bus.
    pub fn register(self: &Arc<Self>, bus: &EventBus) {
        let registry = Arc::clone(self);
        bus.repository()
            .subscribe(move |event: &RepositoryEvent| registry.handle_repository_event(event));
    }

    /// Mark a repository as exporting until the returned guard is dropped.
    pub fn mark_exporting(self: &Arc<Self>, id: RepositoryId) -> ExportingGuard {
        self.exporting
            .write()
            .expect("status lock poisoned")
            .insert(id.clone());
        debug!(repository = %id, "export started");
        ExportingGuard {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Run `f` with the repository marked as exporting.
    ///
    /// The flag is cleared when `f` returns — and also when it panics, since
    /// the guard is dropped during unwinding. A failed export must never
    /// leave its repository permanently read-only.
    pub fn with_exporting<R>(self: &Arc<Self>, id: &RepositoryId, f: impl FnOnce() -> R) -> R {
        let _guard = self.mark_exporting(id.clone());
        f()
    }
}

impl Default for GateStatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the exporting flag on drop.
pub struct ExportingGuard {
    registry: Arc<GateStatusRegistry>,
    id: RepositoryId,
}

impl Drop for ExportingGuard {
    fn drop(&mut self) {
        self.registry
            .exporting
            .write()
            .expect("status lock poisoned")
            .remove(&self.id);
        debug!(repository = %self.id, "export finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, archived: bool) -> Repository {
        let mut r = Repository::new("ns", "name", "git");
        r.id = RepositoryId::new(id);
        r.archived = archived;
        r
    }

    #[test]
    fn seed_marks_archived_repositories() {
        let registry = GateStatusRegistry::new();
        let repos = vec![repo("a", true), repo("b", false), repo("c", true)];
        registry.seed(&repos);

        assert!(registry.is_archived(&RepositoryId::new("a")));
        assert!(!registry.is_archived(&RepositoryId::new("b")));
        assert!(registry.is_archived(&RepositoryId::new("c")));
    }

    #[test]
    fn modification_events_mirror_archived_flag() {
        let registry = GateStatusRegistry::new();
        let id = RepositoryId::new("r1");

        registry.handle_repository_event(&RepositoryEvent::modified(
            repo("r1", true),
            repo("r1", false),
        ));
        assert!(registry.is_archived(&id));

        registry.handle_repository_event(&RepositoryEvent::modified(
            repo("r1", false),
            repo("r1", true),
        ));
        assert!(!registry.is_archived(&id));
    }

    #[test]
    fn deletion_clears_archived_flag() {
        let registry = GateStatusRegistry::new();
        registry.seed(&[repo("r1", true)]);
        registry.handle_repository_event(&RepositoryEvent::deleted(repo("r1", true)));
        assert!(!registry.is_archived(&RepositoryId::new("r1")));
    }

    #[test]
    fn registered_registry_follows_bus_events() {
        let registry = Arc::new(GateStatusRegistry::new());
        let bus = EventBus::new();
        registry.register(&bus);

        bus.publish_repository(RepositoryEvent::modified(repo("r1", true), repo("r1", false)));
        assert!(registry.is_archived(&RepositoryId::new("r1")));
    }

    #[test]
    fn exporting_flag_cleared_after_callback() {
        let registry = Arc::new(GateStatusRegistry::new());
        let id = RepositoryId::new("r1");

        let result = registry.with_exporting(&id, || {
            assert!(registry.is_exporting(&id));
            42
        });
        assert_eq!(result, 42);
        assert!(!registry.is_exporting(&id));
    }

    #[test]
    fn exporting_flag_cleared_when_callback_panics() {
        let registry = Arc::new(GateStatusRegistry::new());
        let id = RepositoryId::new("r1");

        let panicking = Arc::clone(&registry);
        let panicking_id = id.clone();
        let outcome = std::panic::catch_unwind(move || {
            panicking.with_exporting(&panicking_id, || panic!("disk full"));
        });
        assert!(outcome.is_err());
        assert!(!registry.is_exporting(&id));
    }

    #[test]
    fn exporting_flag_cleared_when_callback_errors() {
        let registry = Arc::new(GateStatusRegistry::new());
        let id = RepositoryId::new("r1");

        let result: Result<(), std::io::Error> = registry.with_exporting(&id, || {
            Err(std::io::Error::other("bundle write failed"))
        });
        assert!(result.is_err());
        assert!(!registry.is_exporting(&id));
    }
}
