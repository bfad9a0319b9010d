//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::PostService;
use quill_core::ports::{ImageStorage, PostRepository};
use quill_infra::{InMemoryPostRepository, LocalDiskStorage};

#[cfg(feature = "postgres")]
use quill_infra::{DatabaseConnections, PostgresPostRepository};

use crate::config::AppConfig;

/// Which repository backs the post service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    InMemory,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::InMemory => "in-memory",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub backend: Backend,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Self {
        let storage: Arc<dyn ImageStorage> =
            Arc::new(LocalDiskStorage::new(config.storage.clone()));

        #[cfg(feature = "postgres")]
        {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => {
                        let connections = Arc::new(connections);
                        let repo: Arc<dyn PostRepository> =
                            Arc::new(PostgresPostRepository::new(connections.main.clone()));
                        tracing::info!(backend = "postgres", "Application state initialized");
                        return Self {
                            posts: Arc::new(PostService::new(repo, storage, config.posts.clone())),
                            backend: Backend::Postgres,
                            db: Some(connections),
                        };
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running with in-memory posts.");
            }
        }

        #[cfg(not(feature = "postgres"))]
        tracing::info!("Running without postgres feature - using in-memory repository");

        Self::with_adapters(
            Arc::new(InMemoryPostRepository::new()),
            storage,
            config.posts.clone(),
        )
    }

    /// State over explicit in-memory adapters.
    pub fn with_adapters(
        repo: Arc<dyn PostRepository>,
        storage: Arc<dyn ImageStorage>,
        posts: quill_core::PostServiceConfig,
    ) -> Self {
        Self {
            posts: Arc::new(PostService::new(repo, storage, posts)),
            backend: Backend::InMemory,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }
}
