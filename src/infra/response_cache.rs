//! Distributed response-cache boundary.
//!
//! A generic key→bytes cache used by the surrounding application to memoize
//! computed responses. Keys are namespaced by a logical kind plus the
//! caller's key so unrelated cached value types cannot collide. The catalog
//! engine only ever calls `remove` (on post delete); population and
//! consultation are the application's business.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, kind: &str, key: &str) -> Option<Bytes>;
    async fn set(&self, kind: &str, key: &str, value: Bytes);
    async fn remove(&self, kind: &str, key: &str);
}

fn namespaced(kind: &str, key: &str) -> String {
    format!("{kind}_{key}")
}

/// Process-local response cache. A networked implementation (e.g. Redis)
/// slots in behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: DashMap<String, Bytes>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, kind: &str, key: &str) -> Option<Bytes> {
        let key = namespaced(kind, key);
        let hit = self.entries.get(&key).map(|entry| entry.value().clone());
        trace!(key, hit = hit.is_some(), "response cache get");
        hit
    }

    async fn set(&self, kind: &str, key: &str, value: Bytes) {
        let key = namespaced(kind, key);
        trace!(key, bytes = value.len(), "response cache set");
        self.entries.insert(key, value);
    }

    async fn remove(&self, kind: &str, key: &str) {
        let key = namespaced(kind, key);
        trace!(key, "response cache remove");
        self.entries.remove(&key);
    }
}
