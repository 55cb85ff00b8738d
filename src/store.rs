//! Cache store adapter
//!
//! Thin contract over a get/put key-value backend with per-entry TTL and
//! last-write-wins semantics. The backend itself is external; the bundled
//! [`MemoryStore`] exists for tests and single-process deployments.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::Result;

/// Contract over a string-valued key-value backend.
///
/// Implementations provide last-write-wins semantics per key; no
/// read-modify-write or locking is required of callers. Failures are
/// per-key and must not affect sibling operations.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns `None` for missing or expired entries.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under `key`. `ttl: None` means the entry never expires.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
}

#[derive(Debug)]
struct StoreEntry {
    value: String,
    /// When the entry expires (None for no expiration)
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| Instant::now() >= expires)
    }
}

/// In-memory [`CacheStore`] backend with lazy expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoreEntry>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    /// Whether the store holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if entry.is_expired() {
                    true
                } else {
                    return Ok(Some(entry.value.clone()));
                }
            }
        };

        if expired {
            // Lazy cleanup; the read guard is released before removal
            self.entries.remove(key);
            trace!("Evicted expired cache entry: {}", key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        trace!(
            "Storing {} bytes under key {} (ttl {:?})",
            value.len(),
            key,
            ttl
        );
        self.entries
            .insert(key.to_string(), StoreEntry::new(value, ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryStore::new();
        store
            .put("badge@10-14", "image/png;base64,".to_string(), None)
            .await
            .unwrap();

        assert_eq!(
            store.get("badge@10-14").await.unwrap(),
            Some("image/png;base64,".to_string())
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = MemoryStore::new();
        store
            .put("short", "v".to_string(), Some(Duration::from_millis(30)))
            .await
            .unwrap();
        store.put("forever", "v".to_string(), None).await.unwrap();

        assert!(store.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.get("forever").await.unwrap().is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        store
            .put("k", "first".to_string(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        store
            .put("k", "second".to_string(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("second".to_string()));
        assert_eq!(store.len(), 1);
    }
}
