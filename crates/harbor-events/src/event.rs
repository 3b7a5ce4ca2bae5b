use serde::{Deserialize, Serialize};

use harbor_types::{Changeset, Repository, RepositoryId};

/// What happened to a repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepositoryEventKind {
    /// A repository was created.
    Created,
    /// A repository's metadata changed (rename, description, archived flag).
    Modified,
    /// A repository was deleted.
    Deleted,
}

impl std::fmt::Display for RepositoryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// A repository CRUD/modification notification.
///
/// For [`RepositoryEventKind::Modified`], `previous` carries the metadata as
/// it was before the change so subscribers can diff (the write gate uses this
/// to mirror the archived flag).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEvent {
    pub kind: RepositoryEventKind,
    pub repository: Repository,
    pub previous: Option<Repository>,
}

impl RepositoryEvent {
    pub fn created(repository: Repository) -> Self {
        Self {
            kind: RepositoryEventKind::Created,
            repository,
            previous: None,
        }
    }

    pub fn modified(repository: Repository, previous: Repository) -> Self {
        Self {
            kind: RepositoryEventKind::Modified,
            repository,
            previous: Some(previous),
        }
    }

    pub fn deleted(repository: Repository) -> Self {
        Self {
            kind: RepositoryEventKind::Deleted,
            repository,
            previous: None,
        }
    }
}

/// Request to drop every cached store instance and cached file content
/// belonging to one repository.
///
/// Fired around operations that move or rewrite a repository's storage
/// wholesale (export, migration), where stale cached wrappers would point at
/// the old physical location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRepositoryCacheEvent {
    pub repository_id: RepositoryId,
}

impl ClearRepositoryCacheEvent {
    pub fn new(repository_id: RepositoryId) -> Self {
        Self { repository_id }
    }
}

/// Fired synchronously before incoming changes are accepted.
///
/// Subscribers may veto, which aborts the push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreReceiveEvent {
    pub repository_id: RepositoryId,
    pub changesets: Vec<Changeset>,
}

/// Fired after incoming changes have been durably committed.
///
/// Delivered asynchronously; subscribers use it for side effects such as
/// clearing read-path caches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceiveEvent {
    pub repository_id: RepositoryId,
    pub changesets: Vec<Changeset>,
}

/// Events that pertain to exactly one repository.
///
/// Implemented by every event on the bus; the blanket [`scoped`] predicate
/// builds on it.
pub trait RepositoryScoped {
    fn repository_id(&self) -> &RepositoryId;
}

impl RepositoryScoped for RepositoryEvent {
    fn repository_id(&self) -> &RepositoryId {
        &self.repository.id
    }
}

impl RepositoryScoped for ClearRepositoryCacheEvent {
    fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }
}

impl RepositoryScoped for PreReceiveEvent {
    fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }
}

impl RepositoryScoped for PostReceiveEvent {
    fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }
}

/// Predicate matching only events for the given repository.
///
/// ```
/// use harbor_events::{scoped, EventBus, PostReceiveEvent};
/// use harbor_types::RepositoryId;
///
/// let bus = EventBus::new();
/// let mine = RepositoryId::new("r1");
/// bus.post_receive()
///     .subscribe_filtered(scoped(mine), |_event: &PostReceiveEvent| {
///         // only changes to r1 land here
///     });
/// ```
pub fn scoped<E: RepositoryScoped>(
    id: harbor_types::RepositoryId,
) -> impl Fn(&E) -> bool + Send + Sync {
    move |event| event.repository_id() == &id
}
