//! Image storage port - object store keyed by relative path.

use async_trait::async_trait;

use crate::domain::ImageUpload;

/// Blob store for post images.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store the upload under `directory` and return its path.
    async fn store(&self, directory: &str, upload: &ImageUpload) -> Result<String, StorageError>;

    /// Delete a stored file. Deleting a missing path succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL for a stored path.
    fn url(&self, path: &str) -> String;
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O failed: {0}")]
    Io(String),
}
