//! # Quill API Server
//!
//! Actix-web entry point for the blog post backend.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        host = %config.host,
        port = config.port,
        storage_root = %config.storage.root.display(),
        purge_images_on_delete = config.posts.purge_images_on_delete,
        "Starting Quill API server"
    );

    let state = AppState::new(&config).await;

    #[cfg(feature = "auth")]
    let token_service: std::sync::Arc<dyn quill_core::ports::TokenService> =
        std::sync::Arc::new(quill_infra::JwtTokenService::from_env());

    #[cfg(not(feature = "auth"))]
    tracing::warn!("Built without the auth feature - authenticated routes will reject every request");

    HttpServer::new(move || {
        let app = App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()));

        #[cfg(feature = "auth")]
        let app = app.app_data(web::Data::new(token_service.clone()));

        app.configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
