//! In-process score cache.
//!
//! Holds serialized score documents keyed by `score:{id}`. Entries carry an
//! optional time-to-live; an expired entry reads as a miss and is dropped by
//! the next [`MemoryCache::purge_expired`] sweep.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::ScoreCache;

/// Thread-safe, in-memory key→bytes cache.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Option<Duration>,
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

impl MemoryCache {
    /// `ttl` of `None` keeps entries until they are deleted or overwritten.
    pub fn new(ttl: Option<Duration>) -> Self {
        MemoryCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.len();
        if removed > 0 {
            debug!("MemoryCache: purged {} expired entries", removed);
        }
        removed
    }

    /// Number of entries, expired or not.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Periodically purge expired entries for as long as the runtime lives.
    pub fn spawn_sweeper(&self, every: Duration) {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                cache.purge_expired().await;
            }
        });
    }
}

#[async_trait]
impl ScoreCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.inner
            .write()
            .await
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new(None);
        assert!(cache.get("score:a").await.unwrap().is_none());

        cache.set("score:a", b"one".to_vec()).await.unwrap();
        assert_eq!(cache.get("score:a").await.unwrap(), Some(b"one".to_vec()));

        cache.set("score:a", b"two".to_vec()).await.unwrap();
        assert_eq!(cache.get("score:a").await.unwrap(), Some(b"two".to_vec()));

        cache.delete("score:a").await.unwrap();
        assert!(cache.get("score:a").await.unwrap().is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let cache = MemoryCache::new(None);
        assert!(cache.delete("score:nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_entries_miss_and_get_purged() {
        let cache = MemoryCache::new(Some(Duration::from_millis(10)));
        cache.set("score:a", b"x".to_vec()).await.unwrap();
        assert!(cache.get("score:a").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("score:a").await.unwrap().is_none());
        assert_eq!(cache.len().await, 1, "expired entry stays until purged");

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let cache = MemoryCache::new(None);
        cache.set("score:a", b"x".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.purge_expired().await, 0);
        assert!(cache.get("score:a").await.unwrap().is_some());
    }
}
