use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use harbor_gate::WriteGate;
use harbor_types::RepositoryId;

use crate::blob_store::Blob;
use crate::error::StoreResult;
use crate::export::{ExportableStore, ImportableStore, StoreExporter};
use crate::traits::{BlobStore, ConfigStore, DataStore};

/// Write-gating wrapper around any store.
///
/// Applied functionally when a repository-scoped store is built: reads pass
/// straight through, every mutation asks the [`WriteGate`] first and fails
/// with the gate's reason (archived vs exporting) when denied. Global and
/// namespace stores are never wrapped.
pub struct Gated<S> {
    inner: S,
    gate: Arc<WriteGate>,
    repository: RepositoryId,
}

impl<S> Gated<S> {
    pub fn new(inner: S, gate: Arc<WriteGate>, repository: RepositoryId) -> Self {
        Self {
            inner,
            gate,
            repository,
        }
    }

    fn check(&self) -> StoreResult<()> {
        self.gate.check(&self.repository)?;
        Ok(())
    }
}

impl<T, S> ConfigStore<T> for Gated<S>
where
    S: ConfigStore<T>,
    T: Send + Sync,
{
    fn read(&self) -> StoreResult<Option<T>> {
        self.inner.read()
    }

    fn write(&self, value: &T) -> StoreResult<()> {
        self.check()?;
        self.inner.write(value)
    }

    fn delete(&self) -> StoreResult<()> {
        self.check()?;
        self.inner.delete()
    }
}

impl<T, S> DataStore<T> for Gated<S>
where
    S: DataStore<T>,
    T: Send + Sync,
{
    fn put(&self, value: &T) -> StoreResult<String> {
        self.check()?;
        self.inner.put(value)
    }

    fn put_with_id(&self, id: &str, value: &T) -> StoreResult<()> {
        self.check()?;
        self.inner.put_with_id(id, value)
    }

    fn get(&self, id: &str) -> StoreResult<Option<T>> {
        self.inner.get(id)
    }

    fn get_all(&self) -> StoreResult<HashMap<String, T>> {
        self.inner.get_all()
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.remove(id)
    }

    fn clear(&self) -> StoreResult<()> {
        self.check()?;
        self.inner.clear()
    }
}

impl<S> BlobStore for Gated<S>
where
    S: BlobStore,
{
    fn create(&self) -> StoreResult<Blob> {
        self.check()?;
        self.inner.create()
    }

    fn create_with_id(&self, id: &str) -> StoreResult<Blob> {
        self.check()?;
        self.inner.create_with_id(id)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Blob>> {
        self.inner.get(id)
    }

    fn get_all(&self) -> StoreResult<Vec<Blob>> {
        self.inner.get_all()
    }

    fn remove(&self, blob: &Blob) -> StoreResult<()> {
        self.check()?;
        self.inner.remove(blob)
    }
}

impl<S> ExportableStore for Gated<S>
where
    S: ExportableStore,
{
    fn export_store(&self, exporter: &mut dyn StoreExporter) -> StoreResult<()> {
        self.inner.export_store(exporter)
    }
}

impl<S> ImportableStore for Gated<S>
where
    S: ImportableStore,
{
    fn import_entry(&self, name: &str, reader: &mut dyn Read) -> StoreResult<()> {
        self.check()?;
        self.inner.import_entry(name, reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::FileBlobStore;
    use crate::cache::FileContentCache;
    use crate::config_store::FileConfigStore;
    use crate::cow::PathLocks;
    use crate::data_store::FileDataStore;
    use crate::error::StoreError;
    use harbor_events::{EventBus, RepositoryEvent};
    use harbor_gate::{GateStatusRegistry, ReadOnlyReason};
    use harbor_types::Repository;

    fn archived_repo(id: &str, archived: bool) -> Repository {
        let mut r = Repository::new("ns", "name", "git");
        r.id = RepositoryId::new(id);
        r.archived = archived;
        r
    }

    struct Fixture {
        registry: Arc<GateStatusRegistry>,
        gate: Arc<WriteGate>,
        locks: Arc<PathLocks>,
        cache: Arc<FileContentCache>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(GateStatusRegistry::new());
        let gate = Arc::new(WriteGate::new(Arc::clone(&registry)));
        Fixture {
            registry,
            gate,
            locks: Arc::new(PathLocks::new()),
            cache: Arc::new(FileContentCache::new(true)),
        }
    }

    fn assert_archived(err: StoreError) {
        match err {
            StoreError::ReadOnly(gate_err) => {
                assert_eq!(gate_err.reason(), &ReadOnlyReason::Archived);
            }
            other => panic!("expected ReadOnly, got {other}"),
        }
    }

    #[test]
    fn archived_repository_rejects_all_store_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture();
        let id = RepositoryId::new("r1");
        fx.registry.seed(&[archived_repo("r1", true)]);

        let config: Gated<FileConfigStore<String>> = Gated::new(
            FileConfigStore::new(
                dir.path().join("cfg.json"),
                Arc::clone(&fx.locks),
                Arc::clone(&fx.cache),
            ),
            Arc::clone(&fx.gate),
            id.clone(),
        );
        assert_archived(config.write(&"v".to_string()).unwrap_err());

        let data: Gated<FileDataStore<String>> = Gated::new(
            FileDataStore::new(
                dir.path().join("data"),
                Arc::clone(&fx.locks),
                Arc::clone(&fx.cache),
            ),
            Arc::clone(&fx.gate),
            id.clone(),
        );
        assert_archived(data.put(&"v".to_string()).unwrap_err());

        let blob_dir = dir.path().join("blob");
        std::fs::create_dir_all(&blob_dir).unwrap();
        let blobs = Gated::new(
            FileBlobStore::new(blob_dir, Arc::clone(&fx.locks)),
            Arc::clone(&fx.gate),
            id,
        );
        assert_archived(blobs.create().unwrap_err());
    }

    #[test]
    fn reads_pass_while_archived() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture();
        let id = RepositoryId::new("r1");

        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let data: Gated<FileDataStore<String>> = Gated::new(
            FileDataStore::new(
                data_dir,
                Arc::clone(&fx.locks),
                Arc::clone(&fx.cache),
            ),
            Arc::clone(&fx.gate),
            id.clone(),
        );
        data.put_with_id("k", &"v".to_string()).unwrap();

        fx.registry.seed(&[archived_repo("r1", true)]);
        assert_eq!(data.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(data.get_all().unwrap().len(), 1);
        assert!(!fx.gate.is_forbidden("read", &id));
    }

    #[test]
    fn unarchiving_restores_writes() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture();
        let bus = EventBus::new();
        fx.registry.register(&bus);

        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let data: Gated<FileDataStore<String>> = Gated::new(
            FileDataStore::new(
                data_dir,
                Arc::clone(&fx.locks),
                Arc::clone(&fx.cache),
            ),
            Arc::clone(&fx.gate),
            RepositoryId::new("r1"),
        );

        bus.publish_repository(RepositoryEvent::modified(
            archived_repo("r1", true),
            archived_repo("r1", false),
        ));
        assert!(data.put(&"v".to_string()).is_err());

        bus.publish_repository(RepositoryEvent::modified(
            archived_repo("r1", false),
            archived_repo("r1", true),
        ));
        assert!(data.put(&"v".to_string()).is_ok());
    }

    #[test]
    fn exporting_rejects_writes_only_during_callback() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture();
        let id = RepositoryId::new("r1");

        let config: Gated<FileConfigStore<u32>> = Gated::new(
            FileConfigStore::new(
                dir.path().join("cfg.json"),
                Arc::clone(&fx.locks),
                Arc::clone(&fx.cache),
            ),
            Arc::clone(&fx.gate),
            id.clone(),
        );

        fx.registry.with_exporting(&id, || {
            let err = config.write(&1).unwrap_err();
            match err {
                StoreError::ReadOnly(gate_err) => {
                    assert_eq!(gate_err.reason(), &ReadOnlyReason::Exporting);
                }
                other => panic!("expected ReadOnly, got {other}"),
            }
        });
        // Guard released: writes work again.
        config.write(&2).unwrap();
        assert_eq!(config.read().unwrap(), Some(2));
    }
}
