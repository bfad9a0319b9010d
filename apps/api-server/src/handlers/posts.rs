//! Post endpoints.

use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::Viewer;
use quill_shared::{DataResponse, MessageResponse};

use super::payload::{RawPayload, post_query};
use super::resource::{post_page, post_resource};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Writers must be admins. Checked before the body is read.
fn editor(identity: &Identity) -> AppResult<Viewer> {
    let viewer = identity.viewer();
    if !viewer.is_admin {
        tracing::debug!(user_id = %viewer.user_id, "Post write refused");
        return Err(AppError::Forbidden);
    }
    Ok(viewer)
}

/// GET /api/posts
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let query = post_query(req.query_string());
    let viewer = identity.viewer();

    let page = state.posts.list(&query, viewer.as_ref()).await?;

    Ok(HttpResponse::Ok().json(post_page(page, state.posts.storage())))
}

/// POST /api/posts
pub async fn store(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let viewer = editor(&identity)?;
    let input = RawPayload::extract(&req, body).await?.into_input()?;

    let details = state.posts.create(&viewer, input).await?;

    Ok(HttpResponse::Created().json(DataResponse::new(post_resource(
        details,
        state.posts.storage(),
    ))))
}

/// GET /api/posts/{id}
pub async fn show(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let viewer = identity.viewer();

    let details = state.posts.show(path.into_inner(), viewer.as_ref()).await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(post_resource(
        details,
        state.posts.storage(),
    ))))
}

/// PUT|PATCH /api/posts/{id}
pub async fn update(
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let viewer = editor(&identity)?;
    let input = RawPayload::extract(&req, body).await?.into_input()?;

    let details = state
        .posts
        .update(&viewer, path.into_inner(), input)
        .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(post_resource(
        details,
        state.posts.storage(),
    ))))
}

/// DELETE /api/posts/{id}
pub async fn destroy(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let viewer = editor(&identity)?;

    state.posts.delete(&viewer, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted.")))
}
