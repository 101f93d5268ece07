//! Blog query façade over the post catalog.
//!
//! Translates paging, filtering and comment requests into catalog calls;
//! holds the listing defaults and the comment-window policy so the HTTP
//! layer stays free of business rules.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::pagination::PagedResult;
use crate::config::BlogSettings;
use crate::domain::posts::{Category, Comment, Post};
use crate::infra::catalog::{CatalogError, PostCatalog};

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("post not found")]
    NotFound,
    #[error("comments are closed for this post")]
    CommentsClosed,
    #[error("invalid comment: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Comment fields as submitted by a reader. The privileged-author flag is
/// deliberately absent: it is derived from the caller's authentication
/// state, never from client input.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author: String,
    pub email: String,
    pub content: String,
}

#[derive(Clone)]
pub struct BlogService {
    catalog: Arc<PostCatalog>,
    posts_per_page: u32,
    comments_close_after_days: u32,
}

impl BlogService {
    pub fn new(catalog: Arc<PostCatalog>, settings: &BlogSettings) -> Self {
        Self {
            catalog,
            posts_per_page: settings.posts_per_page,
            comments_close_after_days: settings.comments_close_after_days,
        }
    }

    pub async fn posts(
        &self,
        count: usize,
        skip: usize,
        is_admin: bool,
    ) -> Result<Vec<Post>, BlogError> {
        Ok(self.catalog.list_posts(count, skip, is_admin).await?)
    }

    pub async fn posts_by_category(
        &self,
        label: &str,
        is_admin: bool,
    ) -> Result<Vec<Post>, BlogError> {
        Ok(self.catalog.list_posts_by_category(label, is_admin).await?)
    }

    /// Paged listing; the page size defaults to the configured
    /// posts-per-page when the caller does not override it.
    pub async fn posts_paged(
        &self,
        page_size: Option<u32>,
        page_number: u32,
        category: Option<&str>,
        is_admin: bool,
    ) -> Result<PagedResult<Post>, BlogError> {
        let page_size = page_size.unwrap_or(self.posts_per_page);
        Ok(self
            .catalog
            .list_posts_paged(page_size, page_number, category, is_admin)
            .await?)
    }

    pub async fn post_by_id(&self, id: &str) -> Result<Option<Post>, BlogError> {
        Ok(self.catalog.get_post_by_id(id).await?)
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, BlogError> {
        Ok(self.catalog.get_post_by_slug(slug).await?)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.catalog.categories()
    }

    pub async fn save_post(&self, post: &mut Post) -> Result<(), BlogError> {
        Ok(self.catalog.save_post(post).await?)
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), BlogError> {
        let post = self
            .catalog
            .get_post_by_id(id)
            .await?
            .ok_or(BlogError::NotFound)?;
        self.catalog.delete_post(&post).await?;
        info!(id, "post deleted");
        Ok(())
    }

    pub async fn save_file(
        &self,
        bytes: Bytes,
        file_name: &str,
        suffix: Option<&str>,
    ) -> Result<String, BlogError> {
        Ok(self.catalog.save_file(bytes, file_name, suffix).await?)
    }

    /// Append a reader comment to a post. Rejected when the post is absent,
    /// the comment window has closed, or author/content are blank after
    /// trimming. Returns the stored comment.
    pub async fn add_comment(
        &self,
        post_id: &str,
        comment: NewComment,
        is_admin: bool,
    ) -> Result<Comment, BlogError> {
        let mut post = self
            .catalog
            .get_post_by_id(post_id)
            .await?
            .ok_or(BlogError::NotFound)?;

        let now = OffsetDateTime::now_utc();
        if !post.comments_open(now, self.comments_close_after_days) {
            return Err(BlogError::CommentsClosed);
        }

        let author = comment.author.trim();
        let email = comment.email.trim();
        let content = comment.content.trim();
        if author.is_empty() {
            return Err(BlogError::Validation("author must not be empty"));
        }
        if content.is_empty() {
            return Err(BlogError::Validation("content must not be empty"));
        }

        let mut comment = Comment::new(author, email, content);
        comment.is_admin = is_admin;

        post.comments.push(comment.clone());
        self.catalog.save_post(&mut post).await?;
        Ok(comment)
    }

    /// Remove a comment from a post and persist the change.
    pub async fn remove_comment(&self, post_id: &str, comment_id: &str) -> Result<(), BlogError> {
        let mut post = self
            .catalog
            .get_post_by_id(post_id)
            .await?
            .ok_or(BlogError::NotFound)?;

        let before = post.comments.len();
        post.comments.retain(|comment| comment.id != comment_id);
        if post.comments.len() == before {
            return Err(BlogError::NotFound);
        }

        self.catalog.save_post(&mut post).await?;
        Ok(())
    }
}
