//! In-memory caches for testing and embedding.
//!
//! [`InMemoryCache`] stores items in a `HashMap` protected by a `RwLock` and
//! enforces memcache-style key and item limits. It can be switched offline to
//! exercise the engine's store fallback. [`NoopCache`] never holds anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::traits::Cache;

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 250;

/// Maximum item size in bytes (1 MiB).
pub const MAX_VALUE_LEN: usize = 1024 * 1024;

/// Hit/miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// An in-memory implementation of [`Cache`].
#[derive(Debug)]
pub struct InMemoryCache {
    items: RwLock<HashMap<String, Vec<u8>>>,
    online: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Take the cache offline (every call fails) or bring it back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the cache holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if an item is held under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.items
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    /// Hit/miss counters since creation.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn check_online(&self) -> CacheResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("cache is offline".into()))
        }
    }

    fn check_key(key: &str) -> CacheResult<()> {
        if key.len() > MAX_KEY_LEN {
            return Err(CacheError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        Ok(())
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check_online()?;
        Self::check_key(key)?;
        let items = self
            .items
            .read()
            .map_err(|e| CacheError::Unavailable(format!("lock poisoned: {e}")))?;
        let found = items.get(key).cloned();
        self.record(found.is_some());
        Ok(found)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        self.check_online()?;
        Self::check_key(key)?;
        if value.len() > MAX_VALUE_LEN {
            return Err(CacheError::ValueTooLarge {
                len: value.len(),
                max: MAX_VALUE_LEN,
            });
        }
        let mut items = self
            .items
            .write()
            .map_err(|e| CacheError::Unavailable(format!("lock poisoned: {e}")))?;
        items.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.check_online()?;
        let mut items = self
            .items
            .write()
            .map_err(|e| CacheError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(items.remove(key).is_some())
    }

    async fn flush(&self) -> CacheResult<()> {
        self.check_online()?;
        let mut items = self
            .items
            .write()
            .map_err(|e| CacheError::Unavailable(format!("lock poisoned: {e}")))?;
        debug!(dropped = items.len(), "cache flushed");
        items.clear();
        Ok(())
    }

    async fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, Vec<u8>>> {
        self.check_online()?;
        let items = self
            .items
            .read()
            .map_err(|e| CacheError::Unavailable(format!("lock poisoned: {e}")))?;
        let mut hits = HashMap::with_capacity(keys.len());
        for key in keys {
            match items.get(key) {
                Some(value) => {
                    self.record(true);
                    hits.insert(key.clone(), value.clone());
                }
                None => self.record(false),
            }
        }
        Ok(hits)
    }
}

/// A cache that holds nothing: every lookup misses, every write is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn flush(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new();
        cache.set("Entity:1", b"abc".to_vec()).await.unwrap();
        assert_eq!(cache.get("Entity:1").await.unwrap(), Some(b"abc".to_vec()));
        assert!(cache.delete("Entity:1").await.unwrap());
        assert_eq!(cache.get("Entity:1").await.unwrap(), None);
        assert!(!cache.delete("Entity:1").await.unwrap());
    }

    #[tokio::test]
    async fn get_multi_returns_only_hits() {
        let cache = InMemoryCache::new();
        cache.set("a", vec![1]).await.unwrap();
        cache.set("c", vec![3]).await.unwrap();
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let hits = cache.get_multi(&keys).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits["c"], vec![3]);
        assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[tokio::test]
    async fn flush_drops_everything() {
        let cache = InMemoryCache::new();
        cache
            .set_multi(vec![("a".into(), vec![1]), ("b".into(), vec![2])])
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);
        cache.flush().await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn offline_cache_fails_every_call() {
        let cache = InMemoryCache::new();
        cache.set("a", vec![1]).await.unwrap();
        cache.set_online(false);
        assert!(matches!(cache.get("a").await, Err(CacheError::Unavailable(_))));
        assert!(cache.set("b", vec![2]).await.is_err());
        cache.set_online(true);
        assert_eq!(cache.get("a").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn limits_are_enforced() {
        let cache = InMemoryCache::new();
        let long_key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            cache.set(&long_key, vec![]).await,
            Err(CacheError::KeyTooLong { .. })
        ));
        let big = vec![0u8; MAX_VALUE_LEN + 1];
        assert!(matches!(
            cache.set("k", big).await,
            Err(CacheError::ValueTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoopCache;
        cache.set("a", vec![1]).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
        let hits = cache.get_multi(&["a".to_string()]).await.unwrap();
        assert!(hits.is_empty());
    }
}
