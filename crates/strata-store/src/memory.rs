use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use strata_types::{Cursor, Key, PropertyList, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::query::{Direction, StoreQuery};
use crate::traits::{Datastore, QueryIterator, QueryResult};

/// In-memory, `BTreeMap`-based datastore.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read/write. Queries are evaluated against a snapshot taken when
/// they start running, so a cursor position stays meaningful as long as the
/// matching set does not change between runs.
pub struct InMemoryDatastore {
    records: RwLock<BTreeMap<Key, PropertyList>>,
    next_id: AtomicU64,
    result_cap: Option<usize>,
}

impl InMemoryDatastore {
    /// Create a new empty datastore.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            result_cap: None,
        }
    }

    /// Create a datastore whose query runs stop after `cap` results, the way
    /// hosted stores cap a single request. Callers resume with the cursor.
    pub fn with_result_cap(cap: usize) -> Self {
        Self {
            result_cap: Some(cap.max(1)),
            ..Self::new()
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Number of records stored under `kind`.
    pub fn count_kind(&self, kind: &str) -> usize {
        self.records
            .read()
            .expect("lock poisoned")
            .keys()
            .filter(|k| k.kind() == kind)
            .count()
    }

    /// Remove all records.
    pub fn clear(&self) {
        self.records.write().expect("lock poisoned").clear();
    }

    /// Evaluate filters and orders, then apply start cursor and offset.
    ///
    /// Returns the absolute position of the first returned result along with
    /// the results themselves (limit applied).
    fn evaluate(&self, query: &StoreQuery) -> (u64, Vec<(Key, PropertyList)>) {
        let map = self.records.read().expect("lock poisoned");

        let mut hits: Vec<(Vec<Value>, &Key, &PropertyList)> = Vec::new();
        for (key, properties) in map.iter() {
            if key.kind() != query.kind {
                continue;
            }
            if !query
                .filters
                .iter()
                .all(|f| f.matches(properties.values(&f.property)))
            {
                continue;
            }
            let mut sort_values = Vec::with_capacity(query.orders.len());
            for order in &query.orders {
                let values = properties.values(&order.property);
                let picked = match order.direction {
                    Direction::Asc => values.min_by(|a, b| a.total_cmp(b)),
                    Direction::Desc => values.max_by(|a, b| a.total_cmp(b)),
                };
                match picked {
                    Some(v) => sort_values.push(v.clone()),
                    None => break,
                }
            }
            // Records without every order property are not in the order index.
            if sort_values.len() != query.orders.len() {
                continue;
            }
            hits.push((sort_values, key, properties));
        }

        // Stable sort: ties keep key order from the BTreeMap scan.
        hits.sort_by(|(a, _, _), (b, _, _)| {
            for ((x, y), order) in a.iter().zip(b.iter()).zip(&query.orders) {
                let ordering = match order.direction {
                    Direction::Asc => x.total_cmp(y),
                    Direction::Desc => y.total_cmp(x),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let start = query.start.map_or(0, |c| c.position() as usize);
        let begin = start.saturating_add(query.offset).min(hits.len());
        let take = query.limit.unwrap_or(usize::MAX);
        let results = hits
            .into_iter()
            .skip(begin)
            .take(take)
            .map(|(_, key, properties)| (key.clone(), properties.clone()))
            .collect();
        (begin as u64, results)
    }
}

impl Default for InMemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDatastore")
            .field("record_count", &self.len())
            .field("result_cap", &self.result_cap)
            .finish()
    }
}

/// Snapshot iterator produced by [`InMemoryDatastore::run`].
struct MemoryIterator {
    pending: VecDeque<QueryResult>,
    position: u64,
    remaining: Option<usize>,
}

#[async_trait]
impl QueryIterator for MemoryIterator {
    async fn next(&mut self) -> StoreResult<Option<QueryResult>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        let Some(result) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.position += 1;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(result))
    }

    fn cursor(&self) -> Cursor {
        Cursor::from_position(self.position)
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn allocate_key(&self, kind: &str) -> StoreResult<Key> {
        if kind.is_empty() {
            return Err(StoreError::InvalidQuery("empty kind".into()));
        }
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(Key::new(kind, id))
    }

    async fn get(&self, key: &Key) -> StoreResult<Option<PropertyList>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &Key, properties: &PropertyList) -> StoreResult<()> {
        if key.kind().is_empty() {
            return Err(StoreError::InvalidKey(key.clone()));
        }
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(key.clone(), properties.clone());
        Ok(())
    }

    async fn delete(&self, key: &Key) -> StoreResult<bool> {
        let mut map = self.records.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    async fn get_multi(&self, keys: &[Key]) -> StoreResult<Vec<Option<PropertyList>>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(keys.iter().map(|k| map.get(k).cloned()).collect())
    }

    async fn put_multi(&self, records: &[(Key, PropertyList)]) -> StoreResult<()> {
        if let Some((key, _)) = records.iter().find(|(k, _)| k.kind().is_empty()) {
            return Err(StoreError::InvalidKey(key.clone()));
        }
        let mut map = self.records.write().expect("lock poisoned");
        for (key, properties) in records {
            map.insert(key.clone(), properties.clone());
        }
        Ok(())
    }

    async fn delete_multi(&self, keys: &[Key]) -> StoreResult<()> {
        let mut map = self.records.write().expect("lock poisoned");
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn run(&self, query: &StoreQuery) -> StoreResult<Box<dyn QueryIterator>> {
        let (position, results) = self.evaluate(query);
        debug!(query = %query, matched = results.len(), "in-memory query");
        let pending = results
            .into_iter()
            .map(|(key, properties)| QueryResult {
                key,
                properties: if query.keys_only { None } else { Some(properties) },
            })
            .collect();
        Ok(Box::new(MemoryIterator {
            pending,
            position,
            remaining: self.result_cap,
        }))
    }

    async fn count(&self, query: &StoreQuery) -> StoreResult<usize> {
        Ok(self.evaluate(query).1.len())
    }
}
