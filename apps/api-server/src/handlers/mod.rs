//! HTTP handlers and route configuration.

mod health;
mod likes;
mod payload;
mod posts;
mod resource;


use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::index))
                    .route("", web::post().to(posts::store))
                    .route("/{id}", web::get().to(posts::show))
                    .route("/{id}", web::put().to(posts::update))
                    .route("/{id}", web::patch().to(posts::update))
                    .route("/{id}", web::delete().to(posts::destroy))
                    .route("/{id}/like", web::post().to(likes::store))
                    .route("/{id}/like", web::delete().to(likes::destroy)),
            ),
    );
}
