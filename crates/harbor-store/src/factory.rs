use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use harbor_events::EventBus;
use harbor_gate::WriteGate;
use harbor_types::{RepositoryId, Scope, StoreType};

use crate::blob_store::FileBlobStore;
use crate::cache::{FileContentCache, StoreHandle, StoreInstanceCache};
use crate::config_store::FileConfigStore;
use crate::cow::PathLocks;
use crate::data_store::FileDataStore;
use crate::error::StoreResult;
use crate::gated::Gated;
use crate::location::{LocationResolver, RepositoryLocations};
use crate::settings::StoreSettings;
use crate::traits::{BlobStore, ConfigStore, DataStore};

/// The store engine facade.
///
/// Owns the location resolver, the path locks, and both cache tiers; hands
/// out store instances by scope, kind, and name. Repository-scoped stores
/// come back wrapped in the write gate; global and namespace stores do not.
///
/// Equal `(scope, kind, name, payload)` lookups return the same instance
/// while the instance cache is enabled — callers may hold on to stores or
/// re-resolve them per call, whichever is convenient.
pub struct StoreFactory {
    resolver: LocationResolver,
    locks: Arc<PathLocks>,
    gate: Arc<WriteGate>,
    instances: StoreInstanceCache,
    contents: Arc<FileContentCache>,
}

impl StoreFactory {
    pub fn new(
        home: impl Into<std::path::PathBuf>,
        repositories: Arc<dyn RepositoryLocations>,
        gate: Arc<WriteGate>,
        settings: StoreSettings,
    ) -> Self {
        let home = home.into();
        info!(
            home = %home.display(),
            instance_cache = settings.instance_cache,
            content_cache = settings.content_cache,
            "store engine started"
        );
        Self {
            resolver: LocationResolver::new(home, repositories),
            locks: Arc::new(PathLocks::new()),
            gate,
            instances: StoreInstanceCache::new(settings.instance_cache),
            contents: Arc::new(FileContentCache::new(settings.content_cache)),
        }
    }

    /// The config store for `(scope, name)`.
    pub fn config_store<T>(&self, scope: &Scope, name: &str) -> StoreResult<Arc<dyn ConfigStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let handle = StoreHandle::new::<T>(scope.clone(), StoreType::Config, name);
        self.instances
            .get_or_try_insert(handle, || self.build_config_store::<T>(scope, name))
    }

    /// The data store for `(scope, name)`.
    pub fn data_store<T>(&self, scope: &Scope, name: &str) -> StoreResult<Arc<dyn DataStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let handle = StoreHandle::new::<T>(scope.clone(), StoreType::Data, name);
        self.instances
            .get_or_try_insert(handle, || self.build_data_store::<T>(scope, name))
    }

    /// The blob store for `(scope, name)`.
    pub fn blob_store(&self, scope: &Scope, name: &str) -> StoreResult<Arc<dyn BlobStore>> {
        let handle = StoreHandle::new::<crate::blob_store::Blob>(
            scope.clone(),
            StoreType::Blob,
            name,
        );
        self.instances
            .get_or_try_insert(handle, || self.build_blob_store(scope, name))
    }

    fn build_config_store<T>(
        &self,
        scope: &Scope,
        name: &str,
    ) -> StoreResult<Arc<dyn ConfigStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let file = self.resolver.config_file(scope, name)?;
        let store = FileConfigStore::new(file, Arc::clone(&self.locks), Arc::clone(&self.contents));
        Ok(match scope.repository_id() {
            Some(id) => Arc::new(Gated::new(store, Arc::clone(&self.gate), id.clone())),
            None => Arc::new(store),
        })
    }

    fn build_data_store<T>(&self, scope: &Scope, name: &str) -> StoreResult<Arc<dyn DataStore<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let directory = self.resolver.entry_dir(scope, StoreType::Data, name)?;
        let store =
            FileDataStore::new(directory, Arc::clone(&self.locks), Arc::clone(&self.contents));
        Ok(match scope.repository_id() {
            Some(id) => Arc::new(Gated::new(store, Arc::clone(&self.gate), id.clone())),
            None => Arc::new(store),
        })
    }

    fn build_blob_store(&self, scope: &Scope, name: &str) -> StoreResult<Arc<dyn BlobStore>> {
        let directory = self.resolver.entry_dir(scope, StoreType::Blob, name)?;
        let store = FileBlobStore::new(directory, Arc::clone(&self.locks));
        Ok(match scope.repository_id() {
            Some(id) => Arc::new(Gated::new(store, Arc::clone(&self.gate), id.clone())),
            None => Arc::new(store),
        })
    }

    /// Drop every cached store instance and cached file content belonging to
    /// the repository.
    pub fn clear_repository_caches(&self, id: &RepositoryId) {
        let instances = self.instances.clear_repository(id);
        let contents = match self.resolver.repository_root(id) {
            Ok(root) => self.contents.evict_under(&root),
            // Location already gone (repository deleted): instance eviction
            // is all there is to do.
            Err(_) => 0,
        };
        debug!(repository = %id, instances, contents, "repository caches cleared");
    }

    /// Subscribe cache eviction to [`harbor_events::ClearRepositoryCacheEvent`].
    pub fn register(self: &Arc<Self>, bus: &EventBus) {
        let factory = Arc::clone(self);
        bus.cache_clear()
            .subscribe(move |event| factory.clear_repository_caches(&event.repository_id));
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }
}
