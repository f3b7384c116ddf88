//! The asynchronous key/value store the caching middleware writes through.
//!
//! The policy layer is deliberately decoupled from any particular backing:
//! [`CacheStore`] is the whole contract, and [`MemoryStore`] is the trivial
//! default used when nothing else is injected. Real deployments substitute a
//! store backed by whatever engine they run (Redis, disk, a shared tier);
//! retry policy, eviction, and TTL enforcement all belong to that
//! implementation, not to this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors surfaced by a cache store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store backend error: {0}")]
    Backend(String),
}

/// An asynchronous key/value store for encoded cache envelopes.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches the stored value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Stores `value` under `key`, replacing any prior value wholesale.
    ///
    /// `ttl` of `None` requests the store's own default retention.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>)
    -> Result<(), StoreError>;
}

/// The default in-memory store: an unbounded map with no eviction.
///
/// The TTL passed to [`set`](CacheStore::set) is accepted and ignored —
/// entries live until overwritten or the process exits. Anything smarter
/// belongs in an injected store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.lock().expect("memory store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        value: Bytes,
        _ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store lock poisoned");
        entries.insert(key.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_is_a_miss() {
        let store = MemoryStore::new();
        assert_eq!(store.get("/nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store
            .set("/page", Bytes::from_static(b"payload"), None)
            .await
            .unwrap();
        assert_eq!(
            store.get("/page").await.unwrap(),
            Some(Bytes::from_static(b"payload"))
        );
    }

    #[tokio::test]
    async fn set_replaces_wholesale() {
        let store = MemoryStore::new();
        store.set("/page", Bytes::from_static(b"first"), None).await.unwrap();
        store
            .set("/page", Bytes::from_static(b"second"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(
            store.get("/page").await.unwrap(),
            Some(Bytes::from_static(b"second"))
        );
    }

    #[tokio::test]
    async fn repeated_identical_writes_are_idempotent() {
        let store = MemoryStore::new();
        let value = Bytes::from_static(b"same");
        store.set("/page", value.clone(), None).await.unwrap();
        store.set("/page", value.clone(), None).await.unwrap();
        assert_eq!(store.get("/page").await.unwrap(), Some(value));
    }
}
