//! Image storage - local disk and an in-memory fallback for tests.

mod local;
mod memory;

pub use local::LocalDiskStorage;
pub use memory::InMemoryImageStorage;

use std::path::PathBuf;

use quill_core::ports::StorageError;

/// Where uploads live and how they are served.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/public"),
            public_url: "/storage".to_string(),
        }
    }
}

impl StorageConfig {
    /// Read `STORAGE_ROOT` and `STORAGE_PUBLIC_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            public_url: std::env::var("STORAGE_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
        }
    }
}

/// Reject absolute paths and parent traversal.
pub(crate) fn check_relative(path: &str) -> Result<(), StorageError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.starts_with('\\')
        || path.split(['/', '\\']).any(|part| part == "..");
    if bad {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

pub(crate) fn public_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
