use async_trait::async_trait;
use strata_types::{Cursor, Key, PropertyList};

use crate::error::StoreResult;
use crate::query::StoreQuery;

/// One result yielded by a query iterator.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub key: Key,
    /// `None` for keys-only queries.
    pub properties: Option<PropertyList>,
}

/// Forward-only iterator over a running query.
#[async_trait]
pub trait QueryIterator: Send {
    /// Advance to the next result.
    ///
    /// Returns `Ok(None)` once the query has no more results. This is the
    /// exhaustion sentinel; an `Err` always means the scan failed.
    async fn next(&mut self) -> StoreResult<Option<QueryResult>>;

    /// Position right after the last result yielded so far.
    fn cursor(&self) -> Cursor;
}

/// Schemaless hierarchical key-value store with property-level indexes.
///
/// All implementations must satisfy these invariants:
/// - Keys are allocated by the store, per kind, and never reused.
/// - `put` replaces the whole property list stored under the key.
/// - Reads of a missing key return `Ok(None)`, never an error.
/// - Implementations are safe to share across tasks; callers add no locking.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Allocate a fresh key under `kind`.
    async fn allocate_key(&self, kind: &str) -> StoreResult<Key>;

    /// Read a record by key. Returns `Ok(None)` if it does not exist.
    async fn get(&self, key: &Key) -> StoreResult<Option<PropertyList>>;

    /// Write (create or replace) the record stored under `key`.
    async fn put(&self, key: &Key, properties: &PropertyList) -> StoreResult<()>;

    /// Delete a record. Returns `true` if it existed.
    async fn delete(&self, key: &Key) -> StoreResult<bool>;

    /// Read several records in one round-trip, positionally aligned with
    /// `keys`.
    ///
    /// Default implementation calls `get()` for each key. Backends may
    /// override for fewer round-trips.
    async fn get_multi(&self, keys: &[Key]) -> StoreResult<Vec<Option<PropertyList>>> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            records.push(self.get(key).await?);
        }
        Ok(records)
    }

    /// Write several records in one round-trip.
    async fn put_multi(&self, records: &[(Key, PropertyList)]) -> StoreResult<()> {
        for (key, properties) in records {
            self.put(key, properties).await?;
        }
        Ok(())
    }

    /// Delete several records in one round-trip.
    async fn delete_multi(&self, keys: &[Key]) -> StoreResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Start running a query.
    async fn run(&self, query: &StoreQuery) -> StoreResult<Box<dyn QueryIterator>>;

    /// Number of results the query would yield, honouring offset and limit.
    async fn count(&self, query: &StoreQuery) -> StoreResult<usize>;
}
