//! Local filesystem backend.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::StorageError;

/// URL prefix under which local artifacts are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Stores artifacts as `{root}/{folder}/{file}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Directory served under [`PUBLIC_PREFIX`].
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(super) async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "Wrote local artifact");
        Ok(())
    }

    pub(super) async fn delete(&self, url: &str) {
        let Some(relative) = self.relative_path(url) else {
            warn!(url, "Not a local artifact URL, skipping delete");
            return;
        };
        let path = self.root.join(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(url, "Local artifact deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(url, "Local artifact already gone");
            }
            Err(e) => error!(url, error = %e, "Failed to delete local artifact"),
        }
    }

    pub(super) fn public_url(&self, key: &str) -> String {
        format!("{PUBLIC_PREFIX}{key}")
    }

    /// Path below the root for a URL we issued, refusing anything that
    /// could escape the root.
    fn relative_path<'u>(&self, url: &'u str) -> Option<&'u Path> {
        let relative = Path::new(url.strip_prefix(PUBLIC_PREFIX)?);
        let safe = relative.components().count() > 0
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then_some(relative)
    }
}
