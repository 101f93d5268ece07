//! In-memory object store for tests and ephemeral deployments.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{ListPage, ObjectStore, StoreError, validate_key};

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Bytes>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.objects.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        validate_key(key)?;
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn write(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.objects.remove(key);
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut names: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(prefix))
            .collect();
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
        format!("memory:///{key}")
    }
}
