use serde::{Deserialize, Serialize};

use crate::repository::{NamespaceName, RepositoryId};

/// The context a store belongs to.
///
/// The scope decides where a store's files live on disk and whether the store
/// is subject to repository write-gating (only [`Scope::Repository`] is).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Server-wide stores under the Harbor home directory.
    Global,
    /// Stores shared by all repositories of one namespace.
    Namespace(NamespaceName),
    /// Stores private to a single repository.
    Repository(RepositoryId),
}

impl Scope {
    /// The repository id, if this is a repository scope.
    pub fn repository_id(&self) -> Option<&RepositoryId> {
        match self {
            Self::Repository(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Namespace(ns) => write!(f, "namespace:{ns}"),
            Self::Repository(id) => write!(f, "repository:{id}"),
        }
    }
}

/// The kind of store.
///
/// Each kind has its own sub-directory per scope and its own file suffix;
/// directory listings only ever consider files carrying the kind's suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    /// Exactly one structured document per store name.
    Config,
    /// Many keyed structured documents per store name.
    Data,
    /// Many raw binary objects per store name.
    Blob,
}

impl StoreType {
    /// Directory segment for this kind (`config`, `data`, `blob`).
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Data => "data",
            Self::Blob => "blob",
        }
    }

    /// File suffix for entries of this kind, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Config | Self::Data => "json",
            Self::Blob => "blob",
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
