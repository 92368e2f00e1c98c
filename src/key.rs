//! Mapping from repository locations to storage object keys.

use crate::host::Repository;
use std::fmt;

const SEPARATOR: char = '/';

/// Location of one object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteObjectKey {
    pub container: String,
    pub path: String,
}

impl RemoteObjectKey {
    /// Resolves the object a resource of `repository` is stored under.
    #[must_use]
    pub fn resolve(repository: &Repository, resource_name: &str) -> Self {
        Self {
            container: resolve_container(&repository.host).to_string(),
            path: resolve_key(&repository.base_dir, resource_name),
        }
    }
}

impl fmt::Display for RemoteObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.path)
    }
}

/// The repository host names the container as-is.
#[must_use]
pub fn resolve_container(host: &str) -> &str {
    host
}

/// Joins `base_dir` (one leading separator stripped) and `resource_name` with a single
/// separator. Names are passed through without normalization.
///
/// A repository rooted at `/` (or with no base directory) maps resources directly to
/// their names, so keys never start with a separator.
#[must_use]
pub fn resolve_key(base_dir: &str, resource_name: &str) -> String {
    let base = base_dir.strip_prefix(SEPARATOR).unwrap_or(base_dir);
    if base.is_empty() {
        return resource_name.to_string();
    }
    format!("{base}{SEPARATOR}{resource_name}")
}
