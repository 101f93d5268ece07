//! Public read surface: post listings, single posts, categories, comments
//! and syndication endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::{blog::NewComment, error::AppError, pagination::PagedResult},
    domain::posts::{Comment, Post},
};

use super::{HttpState, is_admin};

pub(super) fn router() -> Router<HttpState> {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{slug}", get(post_by_slug))
        .route("/api/posts/{id}/comments", post(add_comment))
        .route("/api/categories", get(categories))
        .route("/rss.xml", get(rss_feed))
        .route("/atom.xml", get(atom_feed))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    category: Option<String>,
}

async fn list_posts(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedResult<Post>>, AppError> {
    let admin = is_admin(&state, &headers);
    let page = state
        .blog
        .posts_paged(
            query.page_size,
            query.page.unwrap_or(1),
            query.category.as_deref(),
            admin,
        )
        .await?;
    Ok(Json(page))
}

async fn post_by_slug(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Post>, AppError> {
    let admin = is_admin(&state, &headers);
    let post = state
        .blog
        .post_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound)?;
    if !post.is_visible_to(admin, time::OffsetDateTime::now_utc()) {
        return Err(AppError::NotFound);
    }
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    author: String,
    #[serde(default)]
    email: String,
    content: String,
}

async fn add_comment(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let admin = is_admin(&state, &headers);
    let comment = state
        .blog
        .add_comment(
            &id,
            NewComment {
                author: request.author,
                email: request.email,
                content: request.content,
            },
            admin,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn categories(State(state): State<HttpState>) -> Json<Vec<String>> {
    let labels = state
        .blog
        .categories()
        .into_iter()
        .map(|category| category.label)
        .collect();
    Json(labels)
}

async fn rss_feed(State(state): State<HttpState>) -> Result<Response, AppError> {
    let feed = state.syndication.rss_feed().await?;
    Ok(xml_response("application/rss+xml; charset=utf-8", feed))
}

async fn atom_feed(State(state): State<HttpState>) -> Result<Response, AppError> {
    let feed = state.syndication.atom_feed().await?;
    Ok(xml_response("application/atom+xml; charset=utf-8", feed))
}

async fn sitemap(State(state): State<HttpState>) -> Result<Response, AppError> {
    let sitemap = state.sitemap.sitemap().await?;
    Ok(xml_response("application/xml; charset=utf-8", sitemap))
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.sitemap.robots_txt(),
    )
        .into_response()
}

fn xml_response(content_type: &'static str, body: String) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}
