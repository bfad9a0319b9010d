//! Filesystem-backed image storage.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::domain::ImageUpload;
use quill_core::ports::{ImageStorage, StorageError};

use super::{StorageConfig, check_relative, public_url};

/// Writes uploads below a root directory as `{directory}/{uuid}.{ext}`.
pub struct LocalDiskStorage {
    config: StorageConfig,
}

impl LocalDiskStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        check_relative(path)?;
        Ok(self.config.root.join(path))
    }
}

#[async_trait]
impl ImageStorage for LocalDiskStorage {
    async fn store(&self, directory: &str, upload: &ImageUpload) -> Result<String, StorageError> {
        let path = format!("{}/{}.{}", directory, Uuid::new_v4(), upload.extension());
        let target = self.resolve(&path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(path = %path, bytes = upload.bytes.len(), "Stored image");
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                tracing::debug!(path = %path, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn url(&self, path: &str) -> String {
        public_url(&self.config.public_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &std::path::Path) -> LocalDiskStorage {
        LocalDiskStorage::new(StorageConfig {
            root: root.to_path_buf(),
            public_url: "/storage".into(),
        })
    }

    fn upload(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.into(),
            content_type: Some("image/png".into()),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let path = storage.store("posts", &upload("Cover.PNG")).await.unwrap();
        assert!(path.starts_with("posts/"));
        assert!(path.ends_with(".png"));

        let on_disk = dir.path().join(&path);
        assert_eq!(std::fs::read(&on_disk).unwrap(), vec![0x89, b'P', b'N', b'G']);

        storage.delete(&path).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        storage(dir.path()).delete("posts/nope.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = storage(dir.path()).delete("../outside.png").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_url() {
        let storage = storage(std::path::Path::new("/tmp"));
        assert_eq!(storage.url("posts/a.png"), "/storage/posts/a.png");
    }
}
