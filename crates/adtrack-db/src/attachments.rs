//! Local-filesystem blob store for files attached to offers.

use std::path::{Component, Path, PathBuf};

use crate::DbError;

/// Stores uploaded files under a root directory.
///
/// Keys are relative paths such as `<offer-id>/<file-name>`; anything that
/// could escape the root is rejected before touching the filesystem.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` at `key` under the root, creating parent directories.
    ///
    /// Returns the key that was written. An existing file at the same key is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidAttachmentPath`] for empty, absolute, or
    /// traversing keys, and [`DbError::Io`] if the write fails.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, DbError> {
        let relative = validate_key(key)?;
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!(key, bytes = bytes.len(), "attachment stored");
        Ok(key.to_string())
    }
}

fn validate_key(key: &str) -> Result<PathBuf, DbError> {
    let invalid = |reason| DbError::InvalidAttachmentPath {
        path: key.to_string(),
        reason,
    };

    if key.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(invalid("path contains a forbidden character"));
    }

    let path = Path::new(key);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("path must be relative"));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    Ok(out)
}
