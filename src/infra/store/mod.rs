//! Object store capability: durable key/blob storage behind a narrow trait.
//!
//! The catalog engine is parameterized over this capability instead of a
//! storage class hierarchy; the filesystem backend and the in-memory backend
//! are interchangeable implementations of the same contract.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// One round of a prefix listing. `cursor` carries the continuation token
/// for the next round; `None` means the listing is exhausted.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{key}` not found")]
    NotFound { key: String },
    #[error("invalid object key `{key}`")]
    InvalidKey { key: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key/blob storage for one logical area (post records or uploaded
/// files). Keys are flat names restricted to `[0-9A-Za-z._-]`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the backing area if it does not exist yet. Idempotent.
    async fn ensure(&self) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Read a blob. A missing key is `StoreError::NotFound`, not an empty
    /// payload; callers decide whether absence is an error.
    async fn read(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Write a blob with overwrite semantics.
    async fn write(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Delete a blob. Deleting a missing key is success.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// List keys with the given prefix, at most `page_size` per round,
    /// resuming from `cursor`. Implementations must tolerate multi-round
    /// traversal with stable ordering.
    async fn list(
        &self,
        prefix: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ListPage, StoreError>;

    /// Durable location of a stored blob, suitable for handing to clients.
    fn location(&self, key: &str) -> String;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let portable = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
    // ".." cannot be formed from a portable name with no separators unless it
    // is the whole key.
    if portable && key != "." && key != ".." {
        Ok(())
    } else {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
        })
    }
}
