//! The [`Cache`] trait defining the cache interface.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Keyed byte cache.
///
/// Implementations must be thread-safe (`Send + Sync`). Callers treat every
/// error as a miss, so implementations should fail fast rather than retry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up one item. Returns `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store one item, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()>;

    /// Remove one item. Returns `true` if it was present.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Drop every item.
    async fn flush(&self) -> CacheResult<()>;

    /// Look up several items; the result only contains the hits.
    async fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, Vec<u8>>> {
        let mut hits = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key).await? {
                hits.insert(key.clone(), value);
            }
        }
        Ok(hits)
    }

    /// Store several items.
    async fn set_multi(&self, items: Vec<(String, Vec<u8>)>) -> CacheResult<()> {
        for (key, value) in items {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    /// Remove several items.
    async fn delete_multi(&self, keys: &[String]) -> CacheResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}
