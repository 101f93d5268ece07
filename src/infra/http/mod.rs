//! HTTP surface: a minimal JSON API over the blog façade.

mod admin;
mod public;

use axum::{
    Router,
    http::{HeaderMap, header},
};
use subtle::ConstantTimeEq;

use crate::application::{
    blog::BlogService, sitemap::SitemapService, syndication::SyndicationService,
};

#[derive(Clone)]
pub struct HttpState {
    pub blog: BlogService,
    pub syndication: SyndicationService,
    pub sitemap: SitemapService,
    /// Admin bearer token; `None` disables every admin route and all
    /// privileged visibility.
    pub admin_token: Option<String>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .merge(public::router())
        .merge(admin::router())
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Whether the request carries the configured admin token. Comparison is
/// constant-time; a missing configuration never matches.
pub(crate) fn is_admin(state: &HttpState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.admin_token.as_deref() else {
        return false;
    };
    let Some(candidate) = bearer_token(headers) else {
        return false;
    };
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_requires_the_scheme_prefix() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sekrit"),
        );
        assert_eq!(bearer_token(&headers), Some("sekrit"));
    }
}
