//! Artifact storage for movie posters.
//!
//! Exactly one backend is active per process. [`StorageBackend::from_config`]
//! picks it once at startup; there is no per-call override and no fallback
//! from remote to local when the remote store is unreachable.

mod local;
mod s3;
mod sigv4;

pub use local::{LocalStorage, PUBLIC_PREFIX};
pub use s3::S3Storage;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Longest file extension kept from an uploaded file name.
const MAX_EXTENSION_LENGTH: usize = 10;

/// Errors that can occur while storing an artifact.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Local filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote request could not be sent.
    #[error("remote storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote store answered with a failure status.
    #[error("remote storage rejected the request with status {status}")]
    Remote { status: u16 },

    /// Request signing failed.
    #[error("request signing failed: {0}")]
    Signing(String),

    /// A setting required by the selected backend is missing.
    #[error("missing storage setting: {0}")]
    MissingSetting(&'static str),

    /// Folder name is not a single safe path segment.
    #[error("invalid storage folder: {0}")]
    InvalidFolder(String),
}

impl StorageError {
    /// Whether the failure happened on the remote object store.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Remote { .. })
    }
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
}

/// Which backend the configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    S3,
}

impl BackendKind {
    /// Remote only when requested and both credentials are non-blank.
    #[must_use]
    pub fn select(config: &StorageConfig) -> Self {
        if config.remote_selected() {
            Self::S3
        } else {
            Self::Local
        }
    }
}

/// The active storage backend.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Local(LocalStorage),
    S3(S3Storage),
}

impl StorageBackend {
    /// Build the backend chosen by [`BackendKind::select`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingSetting` if the remote backend is
    /// selected without a bucket or region.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend = match BackendKind::select(config) {
            BackendKind::Local => Self::Local(LocalStorage::new(config.upload_dir.clone())),
            BackendKind::S3 => Self::S3(S3Storage::from_config(&config.s3)?),
        };
        info!(backend = backend.name(), "Storage backend selected");
        Ok(backend)
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::S3(_) => "s3",
        }
    }

    /// Store `upload` under `folder` and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the folder is unsafe or the backend fails.
    pub async fn store(&self, upload: &Upload, folder: &str) -> Result<String, StorageError> {
        validate_folder(folder)?;
        let key = format!("{folder}/{}", generate_file_name(upload.original_name.as_deref()));
        match self {
            Self::Local(local) => local.put(&key, &upload.bytes).await?,
            Self::S3(s3) => {
                s3.put(&key, upload.bytes.clone(), upload.content_type.as_deref())
                    .await?;
            }
        }
        let url = self.public_url(&key);
        info!(backend = self.name(), url = %url, size = upload.bytes.len(), "Artifact stored");
        Ok(url)
    }

    /// Delete the artifact behind `url`.
    ///
    /// Never fails: URLs the backend does not recognise are skipped and
    /// errors are logged.
    pub async fn delete(&self, url: &str) {
        match self {
            Self::Local(local) => local.delete(url).await,
            Self::S3(s3) => s3.delete(url).await,
        }
    }

    /// Public URL for an object key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        match self {
            Self::Local(local) => local.public_url(key),
            Self::S3(s3) => s3.public_url(key),
        }
    }
}

/// A fresh UUID file name keeping the original extension, if it is sane.
fn generate_file_name(original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match extension {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    }
}

fn validate_folder(folder: &str) -> Result<(), StorageError> {
    let valid = !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFolder(folder.to_owned()))
    }
}
