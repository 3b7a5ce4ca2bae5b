use serde::{Deserialize, Serialize};

/// Opaque logical identifier of a hosted repository.
///
/// The id is assigned once at creation time and never changes, independent of
/// the repository's namespace, name, or physical storage location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Create an id from an existing string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// The raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepositoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Name of a repository namespace (the first segment of `namespace/name`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceName(String);

impl NamespaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NamespaceName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NamespaceName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Persisted metadata of a hosted repository.
///
/// This is the unit the repository manager stores and the write gate watches:
/// the `archived` flag here is the durable source of the in-memory archived
/// set, mirrored on every modification event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Stable logical id.
    pub id: RepositoryId,
    /// Namespace the repository lives in.
    pub namespace: NamespaceName,
    /// Repository name within its namespace.
    pub name: String,
    /// Version control system backing the repository (e.g. "git", "hg", "svn").
    pub vcs_kind: String,
    /// Free-form description.
    pub description: String,
    /// Archived repositories reject every mutating store operation.
    pub archived: bool,
}

impl Repository {
    /// Create a non-archived repository with a generated id.
    pub fn new(
        namespace: impl Into<NamespaceName>,
        name: impl Into<String>,
        vcs_kind: impl Into<String>,
    ) -> Self {
        Self {
            id: RepositoryId::generate(),
            namespace: namespace.into(),
            name: name.into(),
            vcs_kind: vcs_kind.into(),
            description: String::new(),
            archived: false,
        }
    }

    /// The `namespace/name` form used in URLs and log output.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// A single accepted change, as reported by a post-receive hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// VCS-native revision identifier.
    pub id: String,
    /// Commit message / description.
    pub description: String,
    /// Author of the change.
    pub author: String,
}

impl Changeset {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            author: author.into(),
        }
    }
}
