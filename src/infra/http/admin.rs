//! Administrative write surface, guarded by the bearer token.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, post, put},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{application::error::AppError, domain::posts::Post};

use super::{HttpState, is_admin};

pub(super) fn router() -> Router<HttpState> {
    Router::new()
        .route("/api/admin/posts", put(save_post))
        .route("/api/admin/posts/{id}", delete(delete_post))
        .route(
            "/api/admin/posts/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
        .route("/api/admin/files", post(save_file))
}

fn require_admin(state: &HttpState, headers: &HeaderMap) -> Result<(), Response> {
    if is_admin(state, headers) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "Unauthorized").into_response())
    }
}

/// Post fields accepted from the editor. A missing `id` creates a new post;
/// a present one updates it in place (last write wins).
#[derive(Debug, Deserialize)]
pub struct SavePostRequest {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub publish: bool,
}

async fn save_post(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(request): Json<SavePostRequest>,
) -> Result<Response, AppError> {
    if let Err(denied) = require_admin(&state, &headers) {
        return Ok(denied);
    }

    let now = OffsetDateTime::now_utc();
    let (mut post, created) = match &request.id {
        Some(id) => {
            let post = state.blog.post_by_id(id).await?.ok_or(AppError::NotFound)?;
            (post, false)
        }
        None => (Post::new(request.title.clone(), String::new()), true),
    };

    post.title = request.title;
    post.excerpt = request.excerpt;
    post.content = request.content;
    post.categories = request.categories;
    if let Some(slug) = request.slug {
        post.slug = slug;
    }
    if request.publish {
        post.publish(now);
    } else {
        post.unpublish();
    }

    state.blog.save_post(&mut post).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(post)).into_response())
}

async fn delete_post(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if let Err(denied) = require_admin(&state, &headers) {
        return Ok(denied);
    }

    state.blog.delete_post(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_comment(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if let Err(denied) = require_admin(&state, &headers) {
        return Ok(denied);
    }

    state.blog.remove_comment(&id, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub struct SaveFileQuery {
    pub name: String,
    #[serde(default)]
    pub suffix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedFile {
    pub location: String,
}

async fn save_file(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<SaveFileQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    if let Err(denied) = require_admin(&state, &headers) {
        return Ok(denied);
    }

    if body.is_empty() {
        return Err(AppError::validation("uploaded file is empty"));
    }

    let location = state
        .blog
        .save_file(body, &query.name, query.suffix.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(SavedFile { location })).into_response())
}
