//! Filesystem-backed object store.
//!
//! Blobs live as flat files under a root directory. Writes land in a hidden
//! temporary file and are renamed into place so readers (and restarts) never
//! observe a partially-written blob.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use url::Url;

use super::{ListPage, ObjectStore, StoreError, validate_key};

#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(path).await?)
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(key)?;
        match fs::read(path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn write(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        // Hidden staging name: never matches a portable key prefix, so a
        // crashed write cannot surface in listings.
        let staging = self.root.join(format!(".{key}.tmp"));
        fs::write(&staging, &bytes).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn list(
        &self,
        prefix: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(prefix) && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();

        let start = match cursor {
            Some(cursor) => names.partition_point(|name| name.as_str() <= cursor),
            None => 0,
        };
        let end = (start + page_size.max(1)).min(names.len());
        let keys: Vec<String> = names[start..end].to_vec();
        let cursor = if end < names.len() {
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, cursor })
    }

    fn location(&self, key: &str) -> String {
        let path = self.root.join(key);
        let absolute = std::path::absolute(&path).unwrap_or(path);
        Url::from_file_path(&absolute)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsObjectStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsObjectStore::new(dir.path().join("blobs"));
        (dir, store)
    }

    #[tokio::test]
    async fn write_read_delete_roundtrip() {
        let (_dir, store) = store();
        store.ensure().await.expect("ensure");

        assert!(!store.exists("a.json").await.expect("exists"));
        store
            .write("a.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .expect("write");
        assert!(store.exists("a.json").await.expect("exists"));
        assert_eq!(store.read("a.json").await.expect("read"), "{}");

        store.delete("a.json").await.expect("delete");
        // Idempotent delete
        store.delete("a.json").await.expect("delete twice");
        assert!(matches!(
            store.read("a.json").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn write_overwrites_existing_blob() {
        let (_dir, store) = store();
        store.ensure().await.expect("ensure");

        store
            .write("a.json", Bytes::from_static(b"one"), "application/json")
            .await
            .expect("write");
        store
            .write("a.json", Bytes::from_static(b"two"), "application/json")
            .await
            .expect("overwrite");
        assert_eq!(store.read("a.json").await.expect("read"), "two");
    }

    #[tokio::test]
    async fn list_pages_through_a_continuation_cursor() {
        let (_dir, store) = store();
        store.ensure().await.expect("ensure");

        for index in 0..5 {
            store
                .write(
                    &format!("post-{index}.json"),
                    Bytes::from_static(b"{}"),
                    "application/json",
                )
                .await
                .expect("write");
        }
        store
            .write("other.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .expect("write");

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = store
                .list("post-", 2, cursor.as_deref())
                .await
                .expect("list");
            assert!(page.keys.len() <= 2);
            seen.extend(page.keys);
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                "post-0.json",
                "post-1.json",
                "post-2.json",
                "post-3.json",
                "post-4.json"
            ]
        );
    }

    #[tokio::test]
    async fn keys_with_separators_are_rejected() {
        let (_dir, store) = store();
        store.ensure().await.expect("ensure");

        let result = store
            .write("../escape.json", Bytes::from_static(b"x"), "text/plain")
            .await;
        assert!(matches!(result, Err(StoreError::InvalidKey { .. })));
    }

    #[tokio::test]
    async fn location_is_a_file_url() {
        let (_dir, store) = store();
        assert!(store.location("a.json").starts_with("file://"));
    }
}
