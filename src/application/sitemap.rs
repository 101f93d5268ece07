//! Sitemap service for sitemap.xml and robots.txt generation.

use std::sync::Arc;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;

use crate::application::syndication::{normalize_base_url, xml_escape};
use crate::config::BlogSettings;
use crate::infra::catalog::{CatalogError, PostCatalog};

const SITEMAP_POST_LIMIT: usize = 5_000;

/// Service for generating sitemap.xml and robots.txt.
#[derive(Clone)]
pub struct SitemapService {
    catalog: Arc<PostCatalog>,
    settings: BlogSettings,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to list posts: {0}")]
    Posts(#[from] CatalogError),
}

impl SitemapService {
    pub fn new(catalog: Arc<PostCatalog>, settings: BlogSettings) -> Self {
        Self { catalog, settings }
    }

    /// Generate sitemap.xml covering the home page and every published post.
    pub async fn sitemap(&self) -> Result<String, SitemapError> {
        let base = normalize_base_url(&self.settings.base_url);
        let posts = self.catalog.list_posts(SITEMAP_POST_LIMIT, 0, false).await?;

        let mut urls = String::new();
        urls.push_str(&format!("  <url>\n    <loc>{base}</loc>\n  </url>\n"));
        for post in posts {
            let last_modified = post
                .updated_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| post.updated_at.to_string());
            urls.push_str(&format!(
                "  <url>\n    <loc>{}blog/{}/</loc>\n    <lastmod>{}</lastmod>\n  </url>\n",
                base,
                xml_escape(&post.slug),
                last_modified,
            ));
        }

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{urls}</urlset>\n"
        ))
    }

    pub fn robots_txt(&self) -> String {
        let base = normalize_base_url(&self.settings.base_url);
        format!("User-agent: *\nAllow: /\nSitemap: {base}sitemap.xml\n")
    }
}
