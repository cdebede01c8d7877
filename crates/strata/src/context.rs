//! Mapper and request contexts.
//!
//! A [`Mapper`] is cheap to clone and shared across tasks. Each request takes
//! a [`Context`] from it; every store and cache call made through the context
//! is raced against the context's cancellation token and deadline.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use strata_cache::Cache;
use strata_schema::{Entity, Schema, SchemaRegistry};
use strata_store::Datastore;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{Error, Result};

struct Shared {
    store: Arc<dyn Datastore>,
    cache: Arc<dyn Cache>,
    registry: Arc<SchemaRegistry>,
    config: EngineConfig,
    /// Cache names whose entries could not be invalidated. Served as misses
    /// until a later write or eviction of the name succeeds.
    stale: Mutex<HashSet<String>>,
}

/// Entry point of the engine: store, cache, schemas, and configuration.
#[derive(Clone)]
pub struct Mapper {
    shared: Arc<Shared>,
}

impl Mapper {
    /// A mapper with the default configuration and its own schema registry.
    pub fn new(store: Arc<dyn Datastore>, cache: Arc<dyn Cache>) -> Self {
        Self::with_config(store, cache, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn Datastore>, cache: Arc<dyn Cache>, config: EngineConfig) -> Self {
        Self::with_registry(store, cache, config, Arc::new(SchemaRegistry::new()))
    }

    /// A mapper sharing `registry` with other mappers.
    pub fn with_registry(
        store: Arc<dyn Datastore>,
        cache: Arc<dyn Cache>,
        config: EngineConfig,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                cache,
                registry,
                config,
                stale: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.shared.registry
    }

    /// Index `T` (and every entity type it nests) ahead of first use.
    pub fn register<T: Entity>(&self) -> Result<Arc<Schema>> {
        Ok(self.shared.registry.ensure::<T>()?)
    }

    /// A fresh request context, bounded by the configured operation timeout.
    pub fn context(&self) -> Context {
        let ctx = Context {
            shared: Arc::clone(&self.shared),
            token: CancellationToken::new(),
            deadline: None,
        };
        match self.shared.config.operation_timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Drop every cached record.
    pub async fn flush_cache(&self) -> Result<()> {
        self.shared.cache.flush().await?;
        self.shared.stale.lock().expect("lock poisoned").clear();
        tracing::info!("cache flushed");
        Ok(())
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.shared.config)
            .field("schemas", &self.shared.registry.len())
            .finish()
    }
}

/// Request scope: cancellation, deadline, and access to the mapper's
/// collaborators.
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A derived context that also expires after `timeout`. The earlier of
    /// the two deadlines wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let at = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < at => existing,
            _ => at,
        };
        Self {
            shared: Arc::clone(&self.shared),
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// A derived context cancelled together with this one, and separately.
    pub fn child(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub(crate) fn store(&self) -> &dyn Datastore {
        self.shared.store.as_ref()
    }

    /// The cache tier, unless disabled by configuration.
    pub(crate) fn cache(&self) -> Option<&dyn Cache> {
        self.shared
            .config
            .cache_enabled
            .then(|| self.shared.cache.as_ref())
    }

    pub(crate) fn stale(&self) -> MutexGuard<'_, HashSet<String>> {
        self.shared.stale.lock().expect("lock poisoned")
    }

    /// Ensure `T`'s schema and mark the entity graph registered.
    pub(crate) fn index<T: Entity>(&self, entity: &mut T) -> Result<Arc<Schema>> {
        Ok(self.shared.registry.index(entity)?)
    }

    pub(crate) fn schema<T: Entity>(&self) -> Result<Arc<Schema>> {
        Ok(self.shared.registry.ensure::<T>()?)
    }

    /// Run one I/O call, aborting on cancellation or deadline.
    pub(crate) async fn io<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        Error: From<E>,
    {
        let expiry = async {
            match self.deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            _ = expiry => Err(Error::DeadlineExceeded),
            result = fut => result.map_err(Error::from),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.token.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}
