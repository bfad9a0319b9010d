//! Like endpoints. Any authenticated user may like a post.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_shared::dto::LikeResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{id}/like
pub async fn store(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let outcome = state
        .posts
        .like(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::Created().json(LikeResponse {
        liked: outcome.liked,
        likes_count: outcome.likes_count,
    }))
}

/// DELETE /api/posts/{id}/like
pub async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let outcome = state
        .posts
        .unlike(path.into_inner(), identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: outcome.liked,
        likes_count: outcome.likes_count,
    }))
}
