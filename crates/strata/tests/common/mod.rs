#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata::{EngineConfig, InMemoryCache, InMemoryDatastore, Mapper};
use strata_schema::fixtures::{sample_parent, Parent};
use strata_store::{Datastore, QueryIterator, StoreQuery, StoreResult};
use strata_types::{Key, PropertyList};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub struct Harness {
    pub store: Arc<InMemoryDatastore>,
    pub cache: Arc<InMemoryCache>,
    pub mapper: Mapper,
}

pub fn harness() -> Harness {
    harness_with(InMemoryDatastore::new(), EngineConfig::default())
}

pub fn harness_with(store: InMemoryDatastore, config: EngineConfig) -> Harness {
    init_tracing();
    let store = Arc::new(store);
    let cache = Arc::new(InMemoryCache::new());
    let mapper = Mapper::with_config(store.clone(), cache.clone(), config);
    Harness {
        store,
        cache,
        mapper,
    }
}

/// Create `n` parents numbered `0..n`.
pub async fn seed_parents(mapper: &Mapper, n: i64) -> Vec<Parent> {
    let ctx = mapper.context();
    let mut parents = Vec::with_capacity(n as usize);
    for i in 0..n {
        let mut parent = sample_parent(&format!("parent-{i}"), i);
        ctx.create(&mut parent).await.unwrap();
        parents.push(parent);
    }
    parents
}

/// Wraps the in-memory store with failure and latency switches.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryDatastore,
    /// Batched reads report every record missing.
    pub lose_records: AtomicBool,
    /// Every call sleeps this many milliseconds first.
    pub delay_ms: AtomicUsize,
}

impl FaultyStore {
    async fn pause(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
    }
}

#[async_trait]
impl Datastore for FaultyStore {
    async fn allocate_key(&self, kind: &str) -> StoreResult<Key> {
        self.pause().await;
        self.inner.allocate_key(kind).await
    }

    async fn get(&self, key: &Key) -> StoreResult<Option<PropertyList>> {
        self.pause().await;
        self.inner.get(key).await
    }

    async fn put(&self, key: &Key, properties: &PropertyList) -> StoreResult<()> {
        self.pause().await;
        self.inner.put(key, properties).await
    }

    async fn delete(&self, key: &Key) -> StoreResult<bool> {
        self.pause().await;
        self.inner.delete(key).await
    }

    async fn get_multi(&self, keys: &[Key]) -> StoreResult<Vec<Option<PropertyList>>> {
        self.pause().await;
        if self.lose_records.load(Ordering::SeqCst) {
            return Ok(vec![None; keys.len()]);
        }
        self.inner.get_multi(keys).await
    }

    async fn run(&self, query: &StoreQuery) -> StoreResult<Box<dyn QueryIterator>> {
        self.pause().await;
        self.inner.run(query).await
    }

    async fn count(&self, query: &StoreQuery) -> StoreResult<usize> {
        self.pause().await;
        self.inner.count(query).await
    }
}
