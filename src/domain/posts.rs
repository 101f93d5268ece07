//! Post, comment and category entities plus the summary projection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use crate::domain::slug::derive_slug;

/// Sentinel publish timestamp carried by posts that are not yet published.
///
/// A post is published iff its publish timestamp is not in the future, so the
/// far-future sentinel keeps drafts invisible without a separate flag.
pub const UNPUBLISHED: OffsetDateTime = datetime!(9999-12-31 23:59:59 UTC);

/// Lightweight projection of a post held in the in-memory summary index.
///
/// Summaries never carry body content or comments; they exist so listing and
/// filtering never have to fetch full records from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub categories: Vec<String>,
}

impl PostSummary {
    pub fn is_published(&self, now: OffsetDateTime) -> bool {
        self.pub_date <= now
    }

    /// Privileged callers see every post; everyone else only published ones.
    pub fn is_visible_to(&self, is_admin: bool, now: OffsetDateTime) -> bool {
        is_admin || self.is_published(now)
    }

    /// Category membership check; labels compare case-insensitively while
    /// remaining stored as provided.
    pub fn has_category(&self, label: &str) -> bool {
        self.categories
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(label))
    }
}

/// Full post entity: the summary fields plus body content and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub categories: Vec<String>,
    pub content: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Create an unpublished post with a fresh timestamp-derived id and a
    /// slug derived from the title.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let title = title.into();
        let now = OffsetDateTime::now_utc();
        Self {
            id: next_post_id(),
            slug: derive_slug(&title),
            title,
            excerpt: String::new(),
            pub_date: UNPUBLISHED,
            created_at: now,
            updated_at: now,
            categories: Vec::new(),
            content: content.into(),
            comments: Vec::new(),
        }
    }

    /// Explicit projection to the index summary: drops body and comments,
    /// keeps everything else.
    pub fn summarize(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            pub_date: self.pub_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            categories: self.categories.clone(),
        }
    }

    pub fn is_published(&self, now: OffsetDateTime) -> bool {
        self.pub_date <= now
    }

    pub fn is_visible_to(&self, is_admin: bool, now: OffsetDateTime) -> bool {
        is_admin || self.is_published(now)
    }

    /// Mark the post published as of `now`. An already-set publish timestamp
    /// is preserved so republishing does not rewrite history.
    pub fn publish(&mut self, now: OffsetDateTime) {
        if self.pub_date >= UNPUBLISHED {
            self.pub_date = now;
        }
    }

    pub fn unpublish(&mut self) {
        self.pub_date = UNPUBLISHED;
    }

    /// Comments stay open for a fixed window after publication.
    pub fn comments_open(&self, now: OffsetDateTime, close_after_days: u32) -> bool {
        self.is_published(now) && self.pub_date + Duration::days(i64::from(close_after_days)) >= now
    }
}

/// Reader comment attached to a post.
///
/// `is_admin` records whether the submitter was authenticated at submission
/// time; it is set by the system and never taken from client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub email: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(default)]
    pub is_admin: bool,
}

impl Comment {
    pub fn new(
        author: impl Into<String>,
        email: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.into(),
            email: email.into(),
            content: content.into(),
            pub_date: OffsetDateTime::now_utc(),
            is_admin: false,
        }
    }
}

/// Category index entry: a label and the ids of the posts tagged with it.
///
/// An entry with no member posts must not persist in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub posts: BTreeSet<String>,
}

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            posts: BTreeSet::new(),
        }
    }
}

/// Generate a monotonically-increasing, timestamp-derived post id.
///
/// Any unique string satisfies the id contract; nanosecond resolution keeps
/// ids from a single process strictly ordered in practice.
pub fn next_post_id() -> String {
    OffsetDateTime::now_utc().unix_timestamp_nanos().to_string()
}
