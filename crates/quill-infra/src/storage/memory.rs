//! In-memory image storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::ImageUpload;
use quill_core::ports::{ImageStorage, StorageError};

use super::{check_relative, public_url};

/// Keeps uploaded bytes in a map keyed by path.
pub struct InMemoryImageStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
    public_url: String,
}

impl InMemoryImageStorage {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            public_url: "/storage".to_string(),
        }
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryImageStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStorage for InMemoryImageStorage {
    async fn store(&self, directory: &str, upload: &ImageUpload) -> Result<String, StorageError> {
        let path = format!("{}/{}.{}", directory, Uuid::new_v4(), upload.extension());
        check_relative(&path)?;
        self.files
            .write()
            .await
            .insert(path.clone(), upload.bytes.clone());
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        check_relative(path)?;
        self.files.write().await.remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        public_url(&self.public_url, path)
    }
}
