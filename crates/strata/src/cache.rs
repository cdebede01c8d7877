//! Cache adapter.
//!
//! Records are cached as bincode-encoded property lists under the encoded
//! store key. The cache is an accelerator only: failures and undecodable
//! items are logged and treated as misses. Cancellation and deadline expiry
//! still abort the operation.
//!
//! A cached entry must never outlive the record it mirrors. A failed write
//! falls back to evicting the entry, and an entry that cannot be evicted
//! either is marked stale on the mapper and read as a miss until a later
//! write or eviction of it succeeds.

use std::collections::HashMap;

use strata_types::{Key, PropertyList};
use tracing::warn;

use crate::context::Context;
use crate::error::{Error, Result};

pub(crate) fn encode_record(props: &PropertyList) -> Result<Vec<u8>> {
    bincode::serialize(props).map_err(|e| Error::Encoding(e.to_string()))
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<PropertyList> {
    bincode::deserialize(bytes).map_err(|e| Error::Encoding(e.to_string()))
}

impl Context {
    pub(crate) async fn cache_get(&self, key: &Key) -> Result<Option<PropertyList>> {
        let Some(cache) = self.cache() else {
            return Ok(None);
        };
        let name = key.encode();
        if self.stale().contains(&name) {
            return Ok(None);
        }
        let bytes = self.best_effort("get", self.io(cache.get(&name))).await?;
        Ok(bytes.flatten().and_then(|b| decoded(key, &b)))
    }

    /// Cached records for `keys`; misses are simply absent.
    pub(crate) async fn cache_get_multi(&self, keys: &[Key]) -> Result<HashMap<Key, PropertyList>> {
        let Some(cache) = self.cache() else {
            return Ok(HashMap::new());
        };
        let wanted: Vec<(&Key, String)> = {
            let stale = self.stale();
            keys.iter()
                .map(|key| (key, key.encode()))
                .filter(|(_, name)| !stale.contains(name))
                .collect()
        };
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }
        let names: Vec<String> = wanted.iter().map(|(_, name)| name.clone()).collect();
        let Some(hits) = self
            .best_effort("get_multi", self.io(cache.get_multi(&names)))
            .await?
        else {
            return Ok(HashMap::new());
        };
        Ok(wanted
            .into_iter()
            .filter_map(|(key, name)| {
                let props = decoded(key, hits.get(&name)?)?;
                Some((key.clone(), props))
            })
            .collect())
    }

    /// Replace the cached record of `key`, or drop it if that fails.
    pub(crate) async fn cache_set(&self, key: &Key, props: &PropertyList) -> Result<()> {
        let Some(cache) = self.cache() else {
            return Ok(());
        };
        let name = key.encode();
        let written = match encode_record(props) {
            Ok(bytes) => self.io(cache.set(&name, bytes)).await,
            Err(e) => Err(e),
        };
        self.settle("set", vec![name], written).await
    }

    pub(crate) async fn cache_set_multi(&self, records: &[(Key, PropertyList)]) -> Result<()> {
        let Some(cache) = self.cache() else {
            return Ok(());
        };
        let names: Vec<String> = records.iter().map(|(key, _)| key.encode()).collect();
        let items = records
            .iter()
            .zip(&names)
            .map(|((_, props), name)| Ok((name.clone(), encode_record(props)?)))
            .collect::<Result<Vec<_>>>();
        let written = match items {
            Ok(items) => self.io(cache.set_multi(items)).await,
            Err(e) => Err(e),
        };
        self.settle("set_multi", names, written).await
    }

    /// Drop the cached records of `keys`.
    pub(crate) async fn cache_evict(&self, keys: &[Key]) -> Result<()> {
        if self.cache().is_none() {
            return Ok(());
        }
        self.drop_entries(keys.iter().map(Key::encode).collect())
            .await
    }

    /// Finish a cache write: a success clears any stale mark, a failure
    /// falls back to eviction.
    async fn settle(&self, op: &'static str, names: Vec<String>, written: Result<()>) -> Result<()> {
        match written {
            Ok(()) => {
                self.unmark(&names);
                Ok(())
            }
            Err(e @ (Error::Cancelled | Error::DeadlineExceeded)) => {
                self.mark(&names);
                Err(e)
            }
            Err(e) => {
                warn!(op, error = %e, count = names.len(), "cache write failed, evicting");
                self.drop_entries(names).await
            }
        }
    }

    async fn drop_entries(&self, names: Vec<String>) -> Result<()> {
        let Some(cache) = self.cache() else {
            return Ok(());
        };
        match self.io(cache.delete_multi(&names)).await {
            Ok(()) => {
                self.unmark(&names);
                Ok(())
            }
            Err(e @ (Error::Cancelled | Error::DeadlineExceeded)) => {
                self.mark(&names);
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, count = names.len(), "cache eviction failed, entries marked stale");
                self.mark(&names);
                Ok(())
            }
        }
    }

    fn mark(&self, names: &[String]) {
        self.stale().extend(names.iter().cloned());
    }

    fn unmark(&self, names: &[String]) {
        let mut stale = self.stale();
        if !stale.is_empty() {
            for name in names {
                stale.remove(name);
            }
        }
    }

    /// Swallow cache read failures; only cancellation and deadline expiry
    /// pass.
    async fn best_effort<T>(
        &self,
        op: &'static str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<Option<T>> {
        match call.await {
            Ok(value) => Ok(Some(value)),
            Err(e @ (Error::Cancelled | Error::DeadlineExceeded)) => Err(e),
            Err(e) => {
                warn!(op, error = %e, "cache call failed, falling back to store");
                Ok(None)
            }
        }
    }
}

fn decoded(key: &Key, bytes: &[u8]) -> Option<PropertyList> {
    match decode_record(bytes) {
        Ok(props) => Some(props),
        Err(e) => {
            warn!(key = %key, error = %e, "discarding undecodable cache item");
            None
        }
    }
}
