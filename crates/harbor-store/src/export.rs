//! Bulk backup and restore of store contents.
//!
//! Export walks a store's directory and hands every file carrying the store
//! kind's suffix to a [`StoreExporter`] sink, as an opaque byte stream.
//! Import writes a raw named entry back into the store through the same
//! copy-on-write commit as regular writes, so a restore can never leave a
//! half-written entry behind.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tracing::debug;

use harbor_types::StoreType;

use crate::blob_store::FileBlobStore;
use crate::config_store::FileConfigStore;
use crate::cow::PathLocks;
use crate::data_store::FileDataStore;
use crate::error::{StoreError, StoreResult};

/// Sink receiving exported store entries.
pub trait StoreExporter {
    /// Receive one entry. `name` is the entry's file name including suffix.
    fn export_entry(
        &mut self,
        name: &str,
        size: u64,
        reader: &mut dyn Read,
    ) -> StoreResult<()>;
}

/// Stores whose raw files can be walked for backup.
pub trait ExportableStore {
    fn export_store(&self, exporter: &mut dyn StoreExporter) -> StoreResult<()>;
}

/// Stores that accept raw entries on the bulk restore path.
pub trait ImportableStore {
    fn import_entry(&self, name: &str, reader: &mut dyn Read) -> StoreResult<()>;
}

fn entry_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn export_file(path: &Path, exporter: &mut dyn StoreExporter) -> StoreResult<()> {
    let Some(name) = entry_name(path) else {
        return Ok(());
    };
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    exporter.export_entry(name, size, &mut file)
}

/// Walk `directory` and export every file with the given suffix.
fn export_directory(
    directory: &Path,
    store_type: StoreType,
    exporter: &mut dyn StoreExporter,
) -> StoreResult<()> {
    let read_dir = match fs::read_dir(directory) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    let mut exported = 0usize;
    for entry in read_dir {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(store_type.extension()) {
            continue;
        }
        export_file(&path, exporter)?;
        exported += 1;
    }
    debug!(directory = %directory.display(), exported, "store exported");
    Ok(())
}

fn validate_entry_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid store entry name: {name:?}"),
        )));
    }
    Ok(())
}

/// Copy a raw entry stream into `directory/name` via the commit protocol.
fn import_into(
    directory: &Path,
    locks: &PathLocks,
    name: &str,
    reader: &mut dyn Read,
) -> StoreResult<()> {
    validate_entry_name(name)?;
    fs::create_dir_all(directory)?;
    let target = directory.join(name);
    locks.commit(&target, |out| {
        std::io::copy(reader, out)?;
        Ok(())
    })
}

impl<T> ExportableStore for FileDataStore<T> {
    fn export_store(&self, exporter: &mut dyn StoreExporter) -> StoreResult<()> {
        export_directory(self.directory(), StoreType::Data, exporter)
    }
}

impl ExportableStore for FileBlobStore {
    fn export_store(&self, exporter: &mut dyn StoreExporter) -> StoreResult<()> {
        export_directory(self.directory(), StoreType::Blob, exporter)
    }
}

impl<T> ExportableStore for FileConfigStore<T> {
    fn export_store(&self, exporter: &mut dyn StoreExporter) -> StoreResult<()> {
        let file = self.file();
        if file.is_file() {
            export_file(file, exporter)?;
        }
        Ok(())
    }
}

impl<T> ImportableStore for FileDataStore<T> {
    fn import_entry(&self, name: &str, reader: &mut dyn Read) -> StoreResult<()> {
        import_into(self.directory(), self.locks(), name, reader)
    }
}

impl ImportableStore for FileBlobStore {
    fn import_entry(&self, name: &str, reader: &mut dyn Read) -> StoreResult<()> {
        import_into(self.directory(), self.locks(), name, reader)
    }
}

impl<T> ImportableStore for FileConfigStore<T> {
    fn import_entry(&self, name: &str, reader: &mut dyn Read) -> StoreResult<()> {
        let directory = self.file().parent().ok_or_else(|| {
            StoreError::Io(std::io::Error::other("config store has no parent directory"))
        })?;
        import_into(directory, self.locks(), name, reader)
    }
}
