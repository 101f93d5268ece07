//! Post & category catalog: the cache-and-storage synchronization engine.
//!
//! The catalog mirrors a durable but slow object store into two fast
//! in-memory indices — post summaries and category membership — and keeps
//! them consistent under concurrent reads and writes. Both indices are
//! persisted as denormalized snapshot blobs so a restart does not force a
//! full re-scan of every record. Source of truth is always the set of
//! individual `post-{id}.json` records; the snapshots are optimization
//! artifacts that can be rebuilt at any time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{
    Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use futures::future::try_join_all;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::pagination::PagedResult;
use crate::domain::posts::{Category, Post, PostSummary};
use crate::domain::slug::{derive_slug, sanitize_file_component};
use crate::infra::codec::{self, CONTENT_TYPE_JSON, CodecError};
use crate::infra::response_cache::ResponseCache;
use crate::infra::store::{ObjectStore, StoreError};

const POST_KEY_PREFIX: &str = "post-";
const JSON_FILE_EXT: &str = ".json";
const SUMMARY_SNAPSHOT_KEY: &str = "summary-cache.json";
const CATEGORY_SNAPSHOT_KEY: &str = "category-cache.json";
const REBUILD_PAGE_SIZE: usize = 20;

/// Response-cache kind under which single-post responses are memoized.
pub const POST_CACHE_KIND: &str = "post";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The cache engine. One instance is constructed at startup and injected
/// wherever storage access is needed; the indices are never global state.
pub struct PostCatalog {
    posts: Arc<dyn ObjectStore>,
    files: Arc<dyn ObjectStore>,
    response_cache: Option<Arc<dyn ResponseCache>>,
    summaries: RwLock<HashMap<String, PostSummary>>,
    categories: RwLock<BTreeMap<String, Category>>,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl PostCatalog {
    pub fn new(posts: Arc<dyn ObjectStore>, files: Arc<dyn ObjectStore>) -> Self {
        Self {
            posts,
            files,
            response_cache: None,
            summaries: RwLock::new(HashMap::new()),
            categories: RwLock::new(BTreeMap::new()),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn with_response_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.response_cache = Some(cache);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Load or rebuild both indices. Idempotent; concurrent callers are
    /// serialized and later calls return once the first has completed.
    /// Callers must not serve traffic until this returns.
    pub async fn initialize(&self) -> Result<(), CatalogError> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        self.posts.ensure().await?;
        self.files.ensure().await?;

        if self.posts.exists(SUMMARY_SNAPSHOT_KEY).await? {
            let bytes = self.posts.read(SUMMARY_SNAPSHOT_KEY).await?;
            let snapshot: HashMap<String, PostSummary> = codec::decode(&bytes)?;
            info!(posts = snapshot.len(), "loaded summary index snapshot");
            *write_lock(&self.summaries, "initialize.summaries") = snapshot;
        } else {
            self.rebuild_summary_index().await?;
        }

        // The category index is always rebuilt from the summary index at
        // startup; its snapshot only serves mid-process readers.
        self.rebuild_category_index().await?;

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Fetch a full post directly from the backing store, bypassing the
    /// summary index (summaries lack body content). Absence is `None`;
    /// a malformed record propagates as an error.
    pub async fn get_post_by_id(&self, id: &str) -> Result<Option<Post>, CatalogError> {
        let key = post_key(id);
        if !self.posts.exists(&key).await? {
            return Ok(None);
        }
        let bytes = match self.posts.read(&key).await {
            Ok(bytes) => bytes,
            // Deleted between the existence check and the read.
            Err(StoreError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(codec::decode(&bytes)?))
    }

    /// Resolve a slug against the summary index (first match wins) and fetch
    /// the full post.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, CatalogError> {
        let id = {
            let summaries = read_lock(&self.summaries, "get_post_by_slug");
            summaries
                .values()
                .find(|summary| summary.slug == slug)
                .map(|summary| summary.id.clone())
        };
        match id {
            Some(id) => self.get_post_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// List visible posts sorted by publish timestamp descending, applying
    /// `skip`/`count` before resolving summaries to full posts.
    pub async fn list_posts(
        &self,
        count: usize,
        skip: usize,
        is_admin: bool,
    ) -> Result<Vec<Post>, CatalogError> {
        let window: Vec<PostSummary> = self
            .visible_summaries(None, is_admin)
            .into_iter()
            .skip(skip)
            .take(count)
            .collect();
        self.resolve_summaries(&window).await
    }

    /// List visible posts belonging to a category (labels compare
    /// case-insensitively), newest first.
    pub async fn list_posts_by_category(
        &self,
        label: &str,
        is_admin: bool,
    ) -> Result<Vec<Post>, CatalogError> {
        let summaries = self.visible_summaries(Some(label), is_admin);
        self.resolve_summaries(&summaries).await
    }

    /// Paged listing with an optional category filter. Paging totals are
    /// computed over the summary index; when a dangling reference is healed
    /// the current page may come back one entry short.
    pub async fn list_posts_paged(
        &self,
        page_size: u32,
        page_number: u32,
        category: Option<&str>,
        is_admin: bool,
    ) -> Result<PagedResult<Post>, CatalogError> {
        let summaries = self.visible_summaries(category, is_admin);
        let page = PagedResult::slice(summaries, page_size, page_number);
        let posts = self.resolve_summaries(&page.items).await?;
        Ok(page.with_items(posts))
    }

    /// Persist a post with overwrite semantics: stamp the modification time,
    /// derive a slug when none is set, write the record, then bring the
    /// in-memory summary and the category index in line. The record write
    /// must succeed before any index is touched.
    pub async fn save_post(&self, post: &mut Post) -> Result<(), CatalogError> {
        post.updated_at = OffsetDateTime::now_utc();
        if post.slug.trim().is_empty() {
            post.slug = derive_slug(&post.title);
        }

        let encoded = codec::encode(post)?;
        self.posts
            .write(&post_key(&post.id), encoded, CONTENT_TYPE_JSON)
            .await?;

        let summary = post.summarize();
        write_lock(&self.summaries, "save_post.summaries").insert(summary.id.clone(), summary);

        self.reconcile_categories(&post.id, &post.categories);
        self.persist_category_snapshot().await?;
        debug!(id = %post.id, slug = %post.slug, "saved post");
        Ok(())
    }

    /// Delete a post and every trace of it: the backing record (idempotent),
    /// the memoized response-cache entry, the in-memory summary, and its
    /// category memberships (pruning categories left empty).
    pub async fn delete_post(&self, post: &Post) -> Result<(), CatalogError> {
        let key = post_key(&post.id);
        if self.posts.exists(&key).await? {
            self.posts.delete(&key).await?;
        }

        if let Some(cache) = &self.response_cache {
            cache.remove(POST_CACHE_KIND, &post.id).await;
        }

        write_lock(&self.summaries, "delete_post.summaries").remove(&post.id);
        self.reconcile_categories(&post.id, &[]);
        self.persist_category_snapshot().await?;
        debug!(id = %post.id, "deleted post");
        Ok(())
    }

    /// Store an uploaded file under a collision-resistant derived name and
    /// return its durable location. Concurrent writes to the same derived
    /// name are last-write-wins by design.
    pub async fn save_file(
        &self,
        bytes: Bytes,
        file_name: &str,
        suffix: Option<&str>,
    ) -> Result<String, CatalogError> {
        let suffix = suffix
            .map(sanitize_file_component)
            .filter(|suffix| !suffix.is_empty())
            .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp_nanos().to_string());

        let path = std::path::Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|value| value.to_str())
            .map(sanitize_file_component)
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "file".to_string());
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .map(sanitize_file_component)
            .filter(|ext| !ext.is_empty());

        let key = match extension {
            Some(ext) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{stem}_{suffix}"),
        };
        let content_type = mime_guess::from_path(&key).first_or_octet_stream();
        self.files
            .write(&key, bytes, content_type.essence_str())
            .await?;
        Ok(self.files.location(&key))
    }

    /// Rebuild the summary index from the full record set: paginate every
    /// `post-` record through the continuation cursor, project each to a
    /// summary, install the fresh map in one step, then persist it as the
    /// snapshot. O(total posts); the snapshot exists to keep this off the
    /// common path.
    pub async fn rebuild_summary_index(&self) -> Result<(), CatalogError> {
        counter!("foglio_summary_rebuild_total").increment(1);

        let mut fresh: HashMap<String, PostSummary> = HashMap::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .posts
                .list(POST_KEY_PREFIX, REBUILD_PAGE_SIZE, cursor.as_deref())
                .await?;
            for key in &page.keys {
                let bytes = self.posts.read(key).await?;
                let post: Post = codec::decode(&bytes)?;
                fresh.insert(post.id.clone(), post.summarize());
            }
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }

        let total = fresh.len();
        let encoded = codec::encode(&fresh)?;
        // Readers switch to the fresh map in one step; the snapshot write
        // then mirrors what is already being served.
        *write_lock(&self.summaries, "rebuild.summaries") = fresh;
        self.posts
            .write(SUMMARY_SNAPSHOT_KEY, encoded, CONTENT_TYPE_JSON)
            .await?;
        info!(posts = total, "rebuilt summary index");
        Ok(())
    }

    /// Current category index entries (no empty categories by invariant).
    pub fn categories(&self) -> Vec<Category> {
        read_lock(&self.categories, "categories")
            .values()
            .cloned()
            .collect()
    }

    pub fn summary(&self, id: &str) -> Option<PostSummary> {
        read_lock(&self.summaries, "summary").get(id).cloned()
    }

    pub fn summary_count(&self) -> usize {
        read_lock(&self.summaries, "summary_count").len()
    }

    fn visible_summaries(&self, category: Option<&str>, is_admin: bool) -> Vec<PostSummary> {
        let now = OffsetDateTime::now_utc();
        let mut summaries: Vec<PostSummary> = {
            let guard = read_lock(&self.summaries, "visible_summaries");
            guard
                .values()
                .filter(|summary| summary.is_visible_to(is_admin, now))
                .filter(|summary| category.is_none_or(|label| summary.has_category(label)))
                .cloned()
                .collect()
        };
        summaries.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then_with(|| b.id.cmp(&a.id)));
        summaries
    }

    /// Resolve summaries to full posts, fetching concurrently within this
    /// call. A summary whose record is gone is a detected inconsistency:
    /// it is dropped from the result and a full rebuild runs before
    /// returning, so the next identical call no longer references it.
    async fn resolve_summaries(
        &self,
        summaries: &[PostSummary],
    ) -> Result<Vec<Post>, CatalogError> {
        let fetched = try_join_all(
            summaries
                .iter()
                .map(|summary| self.get_post_by_id(&summary.id)),
        )
        .await?;

        let mut posts = Vec::with_capacity(fetched.len());
        let mut dangling = 0u64;
        for post in fetched {
            match post {
                Some(post) => posts.push(post),
                None => dangling += 1,
            }
        }

        if dangling > 0 {
            counter!("foglio_index_self_heal_total").increment(dangling);
            warn!(
                dangling,
                "summary index referenced missing records; rebuilding"
            );
            self.rebuild_summary_index().await?;
        }
        Ok(posts)
    }

    /// Reconcile the category index to exactly match the post's current
    /// label list. Idempotent: re-running against an unchanged list is a
    /// no-op. In-memory only; callers persist the snapshot afterwards.
    fn reconcile_categories(&self, post_id: &str, labels: &[String]) {
        let mut categories = write_lock(&self.categories, "reconcile_categories");

        categories.retain(|label, category| {
            if category.posts.contains(post_id) && !labels.iter().any(|live| live == label) {
                category.posts.remove(post_id);
            }
            !category.posts.is_empty()
        });

        for label in labels {
            categories
                .entry(label.clone())
                .or_insert_with(|| Category::new(label.clone()))
                .posts
                .insert(post_id.to_string());
        }
    }

    async fn rebuild_category_index(&self) -> Result<(), CatalogError> {
        let mut fresh: BTreeMap<String, Category> = BTreeMap::new();
        {
            let summaries = read_lock(&self.summaries, "rebuild_category_index");
            for summary in summaries.values() {
                for label in &summary.categories {
                    fresh
                        .entry(label.clone())
                        .or_insert_with(|| Category::new(label.clone()))
                        .posts
                        .insert(summary.id.clone());
                }
            }
        }
        *write_lock(&self.categories, "rebuild_category_index") = fresh;
        self.persist_category_snapshot().await
    }

    /// One snapshot write per save/delete, never per category.
    async fn persist_category_snapshot(&self) -> Result<(), CatalogError> {
        let encoded = {
            let categories = read_lock(&self.categories, "persist_category_snapshot");
            codec::encode(&*categories)?
        };
        self.posts
            .write(CATEGORY_SNAPSHOT_KEY, encoded, CONTENT_TYPE_JSON)
            .await?;
        Ok(())
    }
}

fn post_key(id: &str) -> String {
    format!("{POST_KEY_PREFIX}{id}{JSON_FILE_EXT}")
}

fn read_lock<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(op, "recovered from poisoned catalog lock");
        poisoned.into_inner()
    })
}

fn write_lock<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(op, "recovered from poisoned catalog lock");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::infra::store::MemoryObjectStore;

    use super::*;

    fn catalog() -> PostCatalog {
        PostCatalog::new(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryObjectStore::new()),
        )
    }

    fn published_post(title: &str, categories: &[&str]) -> Post {
        let mut post = Post::new(title, "<p>body</p>");
        post.categories = categories.iter().map(|label| label.to_string()).collect();
        post.publish(OffsetDateTime::now_utc() - Duration::days(1));
        post
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");
        assert!(catalog.is_initialized());
        catalog.initialize().await.expect("second initialize");
    }

    #[tokio::test]
    async fn saved_posts_are_found_by_slug() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let mut post = published_post("Hello World", &["news"]);
        catalog.save_post(&mut post).await.expect("save");

        let found = catalog
            .get_post_by_slug("hello-world")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id, post.id);
        assert_eq!(found.content, "<p>body</p>");
    }

    #[tokio::test]
    async fn reconciliation_is_idempotent() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let mut post = published_post("Twice", &["a", "b"]);
        catalog.save_post(&mut post).await.expect("first save");
        let first = catalog.categories();

        catalog.save_post(&mut post).await.expect("second save");
        let second = catalog.categories();

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
        for category in &second {
            assert_eq!(category.posts.len(), 1);
        }
    }

    #[tokio::test]
    async fn category_membership_follows_the_post() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let mut post = published_post("Moving", &["old"]);
        catalog.save_post(&mut post).await.expect("save");

        post.categories = vec!["new".to_string()];
        catalog.save_post(&mut post).await.expect("resave");

        let categories = catalog.categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].label, "new");
        assert!(categories[0].posts.contains(&post.id));
    }

    #[tokio::test]
    async fn delete_prunes_emptied_categories_only() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let mut solo = published_post("Solo", &["a", "b"]);
        let mut other = published_post("Other", &["b"]);
        catalog.save_post(&mut solo).await.expect("save solo");
        catalog.save_post(&mut other).await.expect("save other");

        catalog.delete_post(&solo).await.expect("delete");

        let categories = catalog.categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].label, "b");
        assert!(!categories[0].posts.contains(&solo.id));
        assert!(categories[0].posts.contains(&other.id));
    }

    #[tokio::test]
    async fn visibility_hides_future_posts_from_public_callers() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let mut current = published_post("Now", &[]);
        let mut scheduled = Post::new("Later", "body");
        scheduled.pub_date = OffsetDateTime::now_utc() + Duration::days(2);
        catalog.save_post(&mut current).await.expect("save current");
        catalog
            .save_post(&mut scheduled)
            .await
            .expect("save scheduled");

        let public = catalog.list_posts(10, 0, false).await.expect("public");
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, current.id);

        let admin = catalog.list_posts(10, 0, true).await.expect("admin");
        assert_eq!(admin.len(), 2);
        // Future-dated first under newest-first ordering.
        assert_eq!(admin[0].id, scheduled.id);
    }

    #[tokio::test]
    async fn paged_listing_filters_by_category() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        for index in 0..3 {
            let mut post = published_post(&format!("News {index}"), &["News"]);
            catalog.save_post(&mut post).await.expect("save");
        }
        let mut misc = published_post("Misc", &["misc"]);
        catalog.save_post(&mut misc).await.expect("save");

        let page = catalog
            .list_posts_paged(2, 1, Some("news"), false)
            .await
            .expect("page");
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next_page());
    }

    #[tokio::test]
    async fn save_file_derives_a_suffixed_portable_name() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let location = catalog
            .save_file(Bytes::from_static(b"fake png"), "my photo?.png", Some("v1"))
            .await
            .expect("save file");
        assert_eq!(location, "memory:///my-photo_v1.png");
    }

    #[tokio::test]
    async fn save_file_defaults_to_a_timestamp_suffix() {
        let catalog = catalog();
        catalog.initialize().await.expect("initialize");

        let location = catalog
            .save_file(Bytes::from_static(b"data"), "notes.txt", None)
            .await
            .expect("save file");
        assert!(location.starts_with("memory:///notes_"));
        assert!(location.ends_with(".txt"));
    }
}
