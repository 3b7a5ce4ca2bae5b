//! Scope-to-directory resolution.
//!
//! Stores never compute paths themselves: the [`LocationResolver`] maps a
//! [`Scope`] and [`StoreType`] to a base directory, and for repository scope
//! delegates the logical-id-to-physical-path step to a pluggable
//! [`RepositoryLocations`] so the physical layout can change without touching
//! store logic.
//!
//! On-disk layout:
//!
//! ```text
//! <home>/var/config/<store>.json                       global config
//! <home>/var/<type>/<store>/<id>.<ext>                 global data/blob
//! <home>/namespaces/<ns>/store/<type>/<store>/...      namespace scope
//! <repository-location>/store/<type>/<store>/...       repository scope
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use harbor_types::{RepositoryId, Scope, StoreType};

use crate::cow::PathLocks;
use crate::error::{StoreError, StoreResult};

/// Pluggable mapping from logical repository ids to physical directories.
///
/// An unknown id is a [`StoreError::LocationNotFound`] — never an empty
/// store.
pub trait RepositoryLocations: Send + Sync {
    fn location_of(&self, id: &RepositoryId) -> StoreResult<PathBuf>;
}

const REGISTRY_FILE: &str = "repository-paths.json";
const REPOSITORIES_DIR: &str = "repositories";

/// The default [`RepositoryLocations`]: a persisted id-to-path database.
///
/// Repositories live in UUID-named directories under
/// `<home>/repositories/`; the mapping itself is a JSON document at
/// `<home>/config/repository-paths.json`, committed through the same
/// copy-on-write protocol as every other store file. A repository's location
/// is assigned once and stays immutable for its lifetime; only an explicit
/// [`set_location`](Self::set_location) (migration/import) changes it.
pub struct PathRegistry {
    home: PathBuf,
    locks: PathLocks,
    paths: RwLock<HashMap<RepositoryId, PathBuf>>,
}

impl PathRegistry {
    /// Open the registry, loading the persisted mapping if present.
    pub fn open(home: impl Into<PathBuf>) -> StoreResult<Self> {
        let home = home.into();
        let registry = Self {
            home,
            locks: PathLocks::new(),
            paths: RwLock::new(HashMap::new()),
        };
        registry.load()?;
        Ok(registry)
    }

    fn registry_file(&self) -> PathBuf {
        self.home.join("config").join(REGISTRY_FILE)
    }

    fn load(&self) -> StoreResult<()> {
        let file = match fs::File::open(self.registry_file()) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let loaded: HashMap<RepositoryId, PathBuf> =
            serde_json::from_reader(BufReader::new(file))
                .map_err(|err| StoreError::Serialization(err.to_string()))?;
        info!(count = loaded.len(), "loaded repository path database");
        *self.paths.write().expect("path registry lock poisoned") = loaded;
        Ok(())
    }

    fn persist(&self, paths: &HashMap<RepositoryId, PathBuf>) -> StoreResult<()> {
        let file = self.registry_file();
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        self.locks.commit(&file, |out| {
            serde_json::to_writer_pretty(out, paths)
                .map_err(|err| StoreError::Serialization(err.to_string()))
        })
    }

    /// Assign a fresh location for a new repository and create its directory.
    pub fn create(&self, id: &RepositoryId) -> StoreResult<PathBuf> {
        let mut paths = self.paths.write().expect("path registry lock poisoned");
        if paths.contains_key(id) {
            return Err(StoreError::AlreadyExists(format!(
                "location for repository {id}"
            )));
        }
        let relative = Path::new(REPOSITORIES_DIR).join(uuid::Uuid::now_v7().to_string());
        let absolute = self.home.join(&relative);
        fs::create_dir_all(&absolute)?;
        paths.insert(id.clone(), relative);
        self.persist(&paths)?;
        debug!(repository = %id, location = %absolute.display(), "assigned repository location");
        Ok(absolute)
    }

    /// Record an explicit location for a repository (migration/import path).
    pub fn set_location(&self, id: &RepositoryId, location: impl Into<PathBuf>) -> StoreResult<()> {
        let mut paths = self.paths.write().expect("path registry lock poisoned");
        if paths.contains_key(id) {
            return Err(StoreError::AlreadyExists(format!(
                "location for repository {id}"
            )));
        }
        paths.insert(id.clone(), location.into());
        self.persist(&paths)
    }

    /// Forget a repository's location. The directory itself is not deleted.
    pub fn remove(&self, id: &RepositoryId) -> StoreResult<()> {
        let mut paths = self.paths.write().expect("path registry lock poisoned");
        if paths.remove(id).is_some() {
            self.persist(&paths)?;
        }
        Ok(())
    }

    /// All known repository ids.
    pub fn ids(&self) -> Vec<RepositoryId> {
        self.paths
            .read()
            .expect("path registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl RepositoryLocations for PathRegistry {
    fn location_of(&self, id: &RepositoryId) -> StoreResult<PathBuf> {
        let paths = self.paths.read().expect("path registry lock poisoned");
        let relative = paths
            .get(id)
            .ok_or_else(|| StoreError::LocationNotFound(id.clone()))?;
        if relative.is_absolute() {
            Ok(relative.clone())
        } else {
            Ok(self.home.join(relative))
        }
    }
}

/// Resolves a scope and store type to the directory the store owns.
///
/// Creates missing directories on first use; never deletes any.
pub struct LocationResolver {
    home: PathBuf,
    repositories: Arc<dyn RepositoryLocations>,
}

impl LocationResolver {
    pub fn new(home: impl Into<PathBuf>, repositories: Arc<dyn RepositoryLocations>) -> Self {
        Self {
            home: home.into(),
            repositories,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The physical root of a repository, for whole-repository operations
    /// (cache eviction, export).
    pub fn repository_root(&self, id: &RepositoryId) -> StoreResult<PathBuf> {
        self.repositories.location_of(id)
    }

    fn base_dir(&self, scope: &Scope, store_type: StoreType) -> StoreResult<PathBuf> {
        let dir = match scope {
            Scope::Global => self.home.join("var").join(store_type.dir_name()),
            Scope::Namespace(ns) => self
                .home
                .join("namespaces")
                .join(ns.as_str())
                .join("store")
                .join(store_type.dir_name()),
            Scope::Repository(id) => self
                .repositories
                .location_of(id)?
                .join("store")
                .join(store_type.dir_name()),
        };
        Ok(dir)
    }

    /// The single file backing a config store.
    pub fn config_file(&self, scope: &Scope, name: &str) -> StoreResult<PathBuf> {
        let dir = self.base_dir(scope, StoreType::Config)?;
        fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("{name}.{}", StoreType::Config.extension())))
    }

    /// The directory holding a data or blob store's entries.
    pub fn entry_dir(&self, scope: &Scope, store_type: StoreType, name: &str) -> StoreResult<PathBuf> {
        let dir = self.base_dir(scope, store_type)?.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_types::NamespaceName;

    fn resolver(home: &Path) -> (Arc<PathRegistry>, LocationResolver) {
        let registry = Arc::new(PathRegistry::open(home).unwrap());
        let resolver = LocationResolver::new(home, Arc::clone(&registry) as Arc<dyn RepositoryLocations>);
        (registry, resolver)
    }

    #[test]
    fn global_config_file_layout() {
        let home = tempfile::tempdir().unwrap();
        let (_registry, resolver) = resolver(home.path());

        let file = resolver.config_file(&Scope::Global, "server").unwrap();
        assert_eq!(file, home.path().join("var/config/server.json"));
        assert!(file.parent().unwrap().is_dir());
    }

    #[test]
    fn namespace_data_dir_layout() {
        let home = tempfile::tempdir().unwrap();
        let (_registry, resolver) = resolver(home.path());

        let scope = Scope::Namespace(NamespaceName::new("infra"));
        let dir = resolver.entry_dir(&scope, StoreType::Data, "issues").unwrap();
        assert_eq!(
            dir,
            home.path().join("namespaces/infra/store/data/issues")
        );
        assert!(dir.is_dir());
    }

    #[test]
    fn repository_blob_dir_layout() {
        let home = tempfile::tempdir().unwrap();
        let (registry, resolver) = resolver(home.path());

        let id = RepositoryId::new("r1");
        let location = registry.create(&id).unwrap();
        let dir = resolver
            .entry_dir(&Scope::Repository(id), StoreType::Blob, "attachments")
            .unwrap();
        assert_eq!(dir, location.join("store/blob/attachments"));
    }

    #[test]
    fn unknown_repository_is_location_not_found() {
        let home = tempfile::tempdir().unwrap();
        let (_registry, resolver) = resolver(home.path());

        let err = resolver
            .config_file(&Scope::Repository(RepositoryId::new("ghost")), "cfg")
            .unwrap_err();
        assert!(matches!(err, StoreError::LocationNotFound(_)));
    }

    #[test]
    fn registry_survives_reopen() {
        let home = tempfile::tempdir().unwrap();
        let id = RepositoryId::new("r1");

        let location = {
            let registry = PathRegistry::open(home.path()).unwrap();
            registry.create(&id).unwrap()
        };

        let reopened = PathRegistry::open(home.path()).unwrap();
        assert_eq!(reopened.location_of(&id).unwrap(), location);
        assert_eq!(reopened.ids(), vec![id]);
    }

    #[test]
    fn create_twice_fails() {
        let home = tempfile::tempdir().unwrap();
        let registry = PathRegistry::open(home.path()).unwrap();
        let id = RepositoryId::new("r1");

        registry.create(&id).unwrap();
        let err = registry.create(&id).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn remove_forgets_but_keeps_directory() {
        let home = tempfile::tempdir().unwrap();
        let registry = PathRegistry::open(home.path()).unwrap();
        let id = RepositoryId::new("r1");

        let location = registry.create(&id).unwrap();
        registry.remove(&id).unwrap();
        assert!(matches!(
            registry.location_of(&id),
            Err(StoreError::LocationNotFound(_))
        ));
        assert!(location.is_dir());
    }

    #[test]
    fn absolute_locations_are_honored() {
        let home = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let registry = PathRegistry::open(home.path()).unwrap();
        let id = RepositoryId::new("imported");

        registry.set_location(&id, elsewhere.path()).unwrap();
        assert_eq!(registry.location_of(&id).unwrap(), elsewhere.path());
    }
}
