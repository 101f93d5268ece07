//! Syndication service for RSS and Atom feed generation.
//!
//! Feeds are built from the most recent published posts; drafts and
//! future-dated posts never appear regardless of who asks.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

use crate::config::BlogSettings;
use crate::infra::catalog::{CatalogError, PostCatalog};

const FEED_ITEM_LIMIT: usize = 50;

/// Service for generating RSS and Atom feeds.
#[derive(Clone)]
pub struct SyndicationService {
    catalog: Arc<PostCatalog>,
    settings: BlogSettings,
}

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to list posts: {0}")]
    Posts(#[from] CatalogError),
}

impl SyndicationService {
    pub fn new(catalog: Arc<PostCatalog>, settings: BlogSettings) -> Self {
        Self { catalog, settings }
    }

    /// Generate RSS 2.0 feed XML.
    pub async fn rss_feed(&self) -> Result<String, SyndicationError> {
        let base = normalize_base_url(&self.settings.base_url);
        let posts = self.catalog.list_posts(FEED_ITEM_LIMIT, 0, false).await?;

        let mut items = String::new();
        for post in posts {
            let pub_date = post
                .pub_date
                .format(&Rfc2822)
                .unwrap_or_else(|_| post.pub_date.to_string());
            let link = format!("{base}blog/{}/", post.slug);
            items.push_str(&format!(
                "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <description><![CDATA[{}]]></description>\n    </item>\n",
                xml_escape(&post.title),
                link,
                link,
                pub_date,
                xml_escape(&post.excerpt),
            ));
        }

        let channel = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
            xml_escape(&self.settings.name),
            base,
            xml_escape(&format!("Posts by {}", self.settings.owner)),
            items
        );

        Ok(channel)
    }

    /// Generate Atom 1.0 feed XML.
    pub async fn atom_feed(&self) -> Result<String, SyndicationError> {
        let base = normalize_base_url(&self.settings.base_url);
        let posts = self.catalog.list_posts(FEED_ITEM_LIMIT, 0, false).await?;

        let updated = posts
            .iter()
            .map(|post| post.updated_at)
            .max()
            .unwrap_or_else(OffsetDateTime::now_utc);
        let updated = updated
            .format(&Rfc3339)
            .unwrap_or_else(|_| updated.to_string());

        let mut entries = String::new();
        for post in posts {
            let published = post
                .pub_date
                .format(&Rfc3339)
                .unwrap_or_else(|_| post.pub_date.to_string());
            let link = format!("{base}blog/{}/", post.slug);
            entries.push_str(&format!(
                "  <entry>\n    <title>{}</title>\n    <link href=\"{}\"/>\n    <id>{}</id>\n    <updated>{}</updated>\n    <summary><![CDATA[{}]]></summary>\n  </entry>\n",
                xml_escape(&post.title),
                link,
                link,
                published,
                xml_escape(&post.excerpt),
            ));
        }

        let feed = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>{}</title>\n  <id>{}</id>\n  <updated>{}</updated>\n  <link href=\"{}atom.xml\" rel=\"self\"/>\n{}\n</feed>\n",
            xml_escape(&self.settings.name),
            base,
            updated,
            base,
            entries
        );

        Ok(feed)
    }
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
