//! The two cache tiers of the store engine.
//!
//! [`StoreInstanceCache`] avoids re-resolving locations and re-wrapping
//! stores on every lookup; [`FileContentCache`] avoids re-deserializing a
//! file whose content is already known. Both are pure optimizations: losing
//! every entry changes performance, never observable behavior. Cached values
//! are immutable snapshots — callers get [`Arc`] clones and must write
//! through the store to change anything.

use std::any::{Any, TypeId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use harbor_types::{RepositoryId, Scope, StoreType};

use crate::error::StoreResult;

/// Identity of a store instance: scope + kind + name + payload type.
///
/// Two equal handles must resolve to the same cached instance while the
/// instance cache is enabled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreHandle {
    scope: Scope,
    store_type: StoreType,
    name: String,
    payload: TypeId,
}

impl StoreHandle {
    pub fn new<T: 'static>(scope: Scope, store_type: StoreType, name: impl Into<String>) -> Self {
        Self {
            scope,
            store_type,
            name: name.into(),
            payload: TypeId::of::<T>(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Cache of constructed store wrappers, keyed by [`StoreHandle`].
pub struct StoreInstanceCache {
    enabled: bool,
    entries: DashMap<StoreHandle, Box<dyn Any + Send + Sync>>,
}

impl StoreInstanceCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: DashMap::new(),
        }
    }

    /// Look up the store for `handle`, building (and caching) it on a miss.
    ///
    /// With the cache disabled, every call builds a fresh — functionally
    /// identical — instance.
    pub fn get_or_try_insert<V, F>(&self, handle: StoreHandle, build: F) -> StoreResult<V>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> StoreResult<V>,
    {
        if !self.enabled {
            return build();
        }
        match self.entries.entry(handle) {
            Entry::Occupied(mut occupied) => {
                if let Some(store) = occupied.get().downcast_ref::<V>() {
                    return Ok(store.clone());
                }
                // The slot holds an instance of an unexpected shape; rebuild.
                let store = build()?;
                occupied.insert(Box::new(store.clone()));
                Ok(store)
            }
            Entry::Vacant(vacant) => {
                let store = build()?;
                vacant.insert(Box::new(store.clone()));
                Ok(store)
            }
        }
    }

    /// Drop every cached instance scoped to the given repository.
    pub fn clear_repository(&self, id: &RepositoryId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|handle, _| handle.scope.repository_id() != Some(id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(repository = %id, dropped, "cleared store instance cache");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache of deserialized file payloads, keyed by absolute path.
pub struct FileContentCache {
    enabled: bool,
    entries: DashMap<PathBuf, Arc<dyn Any + Send + Sync>>,
}

impl FileContentCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: DashMap::new(),
        }
    }

    /// The cached payload for `path`, if present and of the expected type.
    ///
    /// A type mismatch means the store was reused for a different payload
    /// type; the stale entry is evicted so the caller re-reads from disk
    /// rather than silently receiving wrong data.
    pub fn get<T: Send + Sync + 'static>(&self, path: &Path) -> Option<Arc<T>> {
        if !self.enabled {
            return None;
        }
        let entry = self.entries.get(path)?;
        match Arc::clone(entry.value()).downcast::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                drop(entry);
                self.entries.remove(path);
                warn!(path = %path.display(), "cached payload type mismatch, evicting");
                None
            }
        }
    }

    /// Record the payload just read from or written to `path`.
    pub fn put<T: Send + Sync + 'static>(&self, path: &Path, value: Arc<T>) {
        if self.enabled {
            self.entries.insert(path.to_path_buf(), value);
        }
    }

    pub fn evict(&self, path: &Path) {
        self.entries.remove(path);
    }

    /// Drop every entry whose path lies beneath `prefix`.
    pub fn evict_under(&self, prefix: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| !path.starts_with(prefix));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(prefix = %prefix.display(), dropped, "evicted cached file contents");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_for(repo: &str, name: &str) -> StoreHandle {
        StoreHandle::new::<String>(
            Scope::Repository(RepositoryId::new(repo)),
            StoreType::Data,
            name,
        )
    }

    #[test]
    fn equal_handles_hit_the_same_instance() {
        let cache = StoreInstanceCache::new(true);
        let first: Arc<String> = cache
            .get_or_try_insert(handle_for("r1", "s1"), || Ok(Arc::new("built".to_string())))
            .unwrap();
        let second: Arc<String> = cache
            .get_or_try_insert(handle_for("r1", "s1"), || {
                panic!("must not rebuild for an equal handle")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn disabled_instance_cache_always_rebuilds() {
        let cache = StoreInstanceCache::new(false);
        let first: Arc<String> = cache
            .get_or_try_insert(handle_for("r1", "s1"), || Ok(Arc::new("a".to_string())))
            .unwrap();
        let second: Arc<String> = cache
            .get_or_try_insert(handle_for("r1", "s1"), || Ok(Arc::new("a".to_string())))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_repository_is_selective() {
        let cache = StoreInstanceCache::new(true);
        for (repo, name) in [("r1", "a"), ("r1", "b"), ("r2", "a")] {
            let _: Arc<String> = cache
                .get_or_try_insert(handle_for(repo, name), || Ok(Arc::new(name.to_string())))
                .unwrap();
        }
        let global = StoreHandle::new::<String>(Scope::Global, StoreType::Config, "server");
        let _: Arc<String> = cache
            .get_or_try_insert(global, || Ok(Arc::new("g".to_string())))
            .unwrap();

        let dropped = cache.clear_repository(&RepositoryId::new("r1"));
        assert_eq!(dropped, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn payload_type_distinguishes_handles() {
        let scope = Scope::Global;
        let a = StoreHandle::new::<String>(scope.clone(), StoreType::Config, "x");
        let b = StoreHandle::new::<u64>(scope, StoreType::Config, "x");
        assert_ne!(a, b);
    }

    #[test]
    fn content_cache_round_trip() {
        let cache = FileContentCache::new(true);
        let path = Path::new("/stores/data/entry.json");

        assert!(cache.get::<String>(path).is_none());
        cache.put(path, Arc::new("cached".to_string()));
        assert_eq!(*cache.get::<String>(path).unwrap(), "cached");
    }

    #[test]
    fn content_cache_type_mismatch_evicts() {
        let cache = FileContentCache::new(true);
        let path = Path::new("/stores/data/entry.json");
        cache.put(path, Arc::new("text".to_string()));

        // Asking for the wrong type must evict, not answer.
        assert!(cache.get::<u64>(path).is_none());
        assert!(cache.get::<String>(path).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_content_cache_stores_nothing() {
        let cache = FileContentCache::new(false);
        let path = Path::new("/stores/data/entry.json");
        cache.put(path, Arc::new(1u64));
        assert!(cache.get::<u64>(path).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn evict_under_drops_subtree_only() {
        let cache = FileContentCache::new(true);
        cache.put(Path::new("/repos/r1/store/a.json"), Arc::new(1u64));
        cache.put(Path::new("/repos/r1/store/b.json"), Arc::new(2u64));
        cache.put(Path::new("/repos/r2/store/a.json"), Arc::new(3u64));

        let dropped = cache.evict_under(Path::new("/repos/r1"));
        assert_eq!(dropped, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get::<u64>(Path::new("/repos/r2/store/a.json")).unwrap(), 3);
    }
}
