//! Application configuration loaded from environment variables.

use std::env;

use quill_core::PostServiceConfig;
use quill_infra::{DatabaseConfig, StorageConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub storage: StorageConfig,
    pub posts: PostServiceConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            storage: StorageConfig::from_env(),
            posts: PostServiceConfig {
                purge_images_on_delete: env_flag("POSTS_PURGE_IMAGES_ON_DELETE"),
            },
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
