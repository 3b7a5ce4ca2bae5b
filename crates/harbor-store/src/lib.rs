//! File-backed typed store engine for Harbor.
//!
//! This crate is the persistence core of the Harbor server: it durably keeps
//! per-repository, per-namespace, and global structured data on the
//! filesystem, with atomic commits, transparent caching, and write-gating
//! for archived or exporting repositories.
//!
//! # Architecture
//!
//! - [`LocationResolver`] maps a [`harbor_types::Scope`] and store kind to a
//!   physical directory; repository locations come from a pluggable
//!   [`RepositoryLocations`] mapping (default: [`PathRegistry`]).
//! - [`ConfigStore`], [`DataStore`], and [`BlobStore`] are the three store
//!   abstractions; `File*` types implement them on disk.
//! - Every durable write goes through [`PathLocks`]: temp file in the target
//!   directory, then atomic rename. Readers never block.
//! - [`StoreInstanceCache`] and [`FileContentCache`] are the two cache
//!   tiers; both can be disabled via [`StoreSettings`] without changing
//!   behavior.
//! - [`StoreFactory`] is the facade: it resolves, builds, caches, and (for
//!   repository scope) gates store instances, and evicts caches on
//!   [`harbor_events::ClearRepositoryCacheEvent`].
//!
//! # Consistency model
//!
//! Writes to the same file serialize on an in-process lock; writes to
//! different files run in parallel. There is no cross-file transaction —
//! each store file commits independently. Cached values are immutable
//! snapshots; mutating a returned value has no effect until it is written
//! back through the store.

pub mod blob_store;
pub mod cache;
pub mod config_store;
pub mod cow;
pub mod data_store;
pub mod error;
pub mod export;
pub mod factory;
pub mod gated;
pub mod hooks;
pub mod location;
pub mod settings;
pub mod traits;

pub use blob_store::{Blob, FileBlobStore};
pub use cache::{FileContentCache, StoreHandle, StoreInstanceCache};
pub use config_store::FileConfigStore;
pub use cow::PathLocks;
pub use data_store::FileDataStore;
pub use error::{StoreError, StoreResult};
pub use export::{ExportableStore, ImportableStore, StoreExporter};
pub use factory::StoreFactory;
pub use gated::Gated;
pub use hooks::{CacheClearHook, RepositoryViewCache};
pub use location::{LocationResolver, PathRegistry, RepositoryLocations};
pub use settings::StoreSettings;
pub use traits::{BlobStore, ConfigStore, DataStore};
