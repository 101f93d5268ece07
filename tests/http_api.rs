//! Router-level tests for the public and admin JSON API.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use foglio::application::{
    blog::BlogService, sitemap::SitemapService, syndication::SyndicationService,
};
use foglio::config::BlogSettings;
use foglio::infra::catalog::PostCatalog;
use foglio::infra::http::{HttpState, build_router};
use foglio::infra::store::MemoryObjectStore;

const ADMIN_TOKEN: &str = "integration-test-token";

fn blog_settings() -> BlogSettings {
    BlogSettings {
        name: "Foglio".to_string(),
        owner: "The Author".to_string(),
        base_url: "https://example.com/".to_string(),
        posts_per_page: 5,
        comments_close_after_days: 7,
    }
}

async fn test_router() -> Router {
    let catalog = Arc::new(PostCatalog::new(
        Arc::new(MemoryObjectStore::new()),
        Arc::new(MemoryObjectStore::new()),
    ));
    catalog.initialize().await.expect("initialize");

    let settings = blog_settings();
    let state = HttpState {
        blog: BlogService::new(catalog.clone(), &settings),
        syndication: SyndicationService::new(catalog.clone(), settings.clone()),
        sitemap: SitemapService::new(catalog, settings),
        admin_token: Some(ADMIN_TOKEN.to_string()),
    };
    build_router(state)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn save_post_request(body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri("/api/admin/posts")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn admin_routes_reject_missing_or_wrong_tokens() {
    let router = test_router().await;
    let body = json!({ "title": "Nope", "content": "body" });

    let (status, _) = send(&router, save_post_request(body.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&router, save_post_request(body, Some("wrong-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn published_posts_flow_through_the_public_surface() {
    let router = test_router().await;

    let body = json!({
        "title": "Hello World",
        "content": "<p>hi</p>",
        "excerpt": "greeting",
        "categories": ["news"],
        "publish": true,
    });
    let (status, created) = send(&router, save_post_request(body, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "hello-world");

    let (status, listing) = send(
        &router,
        Request::get("/api/posts?category=news")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total_items"], 1);
    assert_eq!(listing["items"][0]["title"], "Hello World");

    let (status, fetched) = send(
        &router,
        Request::get("/api/posts/hello-world")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, labels) = send(
        &router,
        Request::get("/api/categories")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(labels, json!(["news"]));
}

#[tokio::test]
async fn drafts_are_only_visible_with_the_admin_bearer() {
    let router = test_router().await;

    let body = json!({ "title": "Secret Draft", "content": "wip", "publish": false });
    let (status, _) = send(&router, save_post_request(body, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &router,
        Request::get("/api/posts/secret-draft")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listing) = send(
        &router,
        Request::get("/api/posts")
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total_items"], 1);
}

#[tokio::test]
async fn comments_are_accepted_on_published_posts_only() {
    let router = test_router().await;

    let (status, published) = send(
        &router,
        save_post_request(
            json!({ "title": "Open", "content": "body", "publish": true }),
            Some(ADMIN_TOKEN),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = published["id"].as_str().expect("id").to_string();

    let comment = json!({ "author": "Ana", "email": "ana@example.com", "content": "nice" });
    let (status, stored) = send(
        &router,
        Request::post(format!("/api/posts/{post_id}/comments"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(comment.to_string()))
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored["author"], "Ana");
    assert_eq!(stored["is_admin"], false);

    let (status, draft) = send(
        &router,
        save_post_request(
            json!({ "title": "Closed", "content": "body", "publish": false }),
            Some(ADMIN_TOKEN),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let draft_id = draft["id"].as_str().expect("id");

    let (status, _) = send(
        &router,
        Request::post(format!("/api/posts/{draft_id}/comments"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "author": "Ana", "content": "early" }).to_string(),
            ))
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn syndication_endpoints_serve_xml() {
    let router = test_router().await;

    let response = router
        .clone()
        .oneshot(
            Request::get("/rss.xml")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/rss+xml"));

    let (status, robots) = send(
        &router,
        Request::get("/robots.txt")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        robots
            .as_str()
            .expect("text body")
            .contains("Sitemap: https://example.com/sitemap.xml")
    );
}

#[tokio::test]
async fn file_uploads_return_their_durable_location() {
    let router = test_router().await;

    let (status, saved) = send(
        &router,
        Request::post("/api/admin/files?name=logo.png&suffix=v2")
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(&b"png bytes"[..]))
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["location"], "memory:///logo_v2.png");
}
