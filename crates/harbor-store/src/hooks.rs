//! Event-driven cache invalidation.
//!
//! [`CacheClearHook`] is the single hook type used to tie bus events to
//! cache eviction: it pairs a clear action with an optional predicate over
//! the repository id, so a subscriber interested in one repository is never
//! triggered by another's events. [`RepositoryViewCache`] is the read-path
//! cache it typically clears — per-repository derived views (blame, browse,
//! changesets) that become stale once new changes land.

use dashmap::DashMap;

use harbor_events::EventBus;
use harbor_types::RepositoryId;

/// Repository-keyed cache for derived read-path views.
///
/// Values are snapshots: `get` hands out clones, and the whole entry is
/// dropped when the repository changes.
pub struct RepositoryViewCache<V> {
    entries: DashMap<RepositoryId, V>,
}

impl<V: Clone + Send + Sync + 'static> RepositoryViewCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, id: &RepositoryId) -> Option<V> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn put(&self, id: RepositoryId, view: V) {
        self.entries.insert(id, view);
    }

    pub fn clear_repository(&self, id: &RepositoryId) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for RepositoryViewCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

type RepositoryPredicate = Box<dyn Fn(&RepositoryId) -> bool + Send + Sync>;
type ClearAction = Box<dyn Fn(&RepositoryId) + Send + Sync>;

/// A configurable cache-clear hook: predicate + action.
///
/// Register it on the channel whose events should trigger the clear:
/// [`on_cache_clear`](Self::on_cache_clear) for explicit repository cache
/// invalidation, [`on_post_receive`](Self::on_post_receive) for read-path
/// caches that go stale when new changes are accepted.
pub struct CacheClearHook {
    filter: Option<RepositoryPredicate>,
    action: ClearAction,
}

impl CacheClearHook {
    /// A hook that fires for every repository.
    pub fn new(action: impl Fn(&RepositoryId) + Send + Sync + 'static) -> Self {
        Self {
            filter: None,
            action: Box::new(action),
        }
    }

    /// A hook restricted to repositories matching `filter`.
    pub fn filtered(
        filter: impl Fn(&RepositoryId) -> bool + Send + Sync + 'static,
        action: impl Fn(&RepositoryId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            filter: Some(Box::new(filter)),
            action: Box::new(action),
        }
    }

    /// A hook restricted to a single repository.
    pub fn for_repository(
        id: RepositoryId,
        action: impl Fn(&RepositoryId) + Send + Sync + 'static,
    ) -> Self {
        Self::filtered(move |candidate| candidate == &id, action)
    }

    fn handle(&self, id: &RepositoryId) {
        if self.filter.as_ref().map_or(true, |f| f(id)) {
            (self.action)(id);
        }
    }

    /// Fire on [`harbor_events::ClearRepositoryCacheEvent`].
    pub fn on_cache_clear(self, bus: &EventBus) {
        bus.cache_clear()
            .subscribe(move |event| self.handle(&event.repository_id));
    }

    /// Fire on [`harbor_events::PostReceiveEvent`] (asynchronously, once the
    /// triggering changes are durable).
    pub fn on_post_receive(self, bus: &EventBus) {
        bus.post_receive()
            .subscribe(move |event| self.handle(&event.repository_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_events::{ClearRepositoryCacheEvent, PostReceiveEvent};
    use std::sync::Arc;

    #[test]
    fn view_cache_round_trip() {
        let cache: RepositoryViewCache<Vec<String>> = RepositoryViewCache::new();
        let id = RepositoryId::new("r1");

        assert!(cache.get(&id).is_none());
        cache.put(id.clone(), vec!["rev-1".into(), "rev-2".into()]);
        assert_eq!(cache.get(&id).unwrap().len(), 2);

        cache.clear_repository(&id);
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn post_receive_clears_only_the_changed_repository() {
        let bus = EventBus::new();
        let views: Arc<RepositoryViewCache<&'static str>> = Arc::new(RepositoryViewCache::new());

        let mine = RepositoryId::new("mine");
        let other = RepositoryId::new("other");
        views.put(mine.clone(), "blame view");
        views.put(other.clone(), "blame view");

        let cache = Arc::clone(&views);
        CacheClearHook::for_repository(mine.clone(), move |id| cache.clear_repository(id))
            .on_post_receive(&bus);

        bus.publish_post_receive(PostReceiveEvent {
            repository_id: other.clone(),
            changesets: vec![],
        });
        bus.publish_post_receive(PostReceiveEvent {
            repository_id: mine.clone(),
            changesets: vec![],
        });
        bus.flush();

        assert!(views.get(&mine).is_none());
        assert_eq!(views.get(&other), Some("blame view"));
    }

    #[test]
    fn unfiltered_hook_fires_for_every_repository() {
        let bus = EventBus::new();
        let cleared = Arc::new(std::sync::Mutex::new(Vec::new()));

        let seen = Arc::clone(&cleared);
        CacheClearHook::new(move |id| seen.lock().unwrap().push(id.clone()))
            .on_cache_clear(&bus);

        bus.publish_cache_clear(ClearRepositoryCacheEvent::new(RepositoryId::new("a")));
        bus.publish_cache_clear(ClearRepositoryCacheEvent::new(RepositoryId::new("b")));

        assert_eq!(
            cleared.lock().unwrap().as_slice(),
            &[RepositoryId::new("a"), RepositoryId::new("b")]
        );
    }
}
