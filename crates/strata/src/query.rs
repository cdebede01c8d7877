//! Query builder.
//!
//! Builder methods record intent and defer validation errors to execution,
//! so a chain reads top to bottom and the first problem surfaces from the
//! terminal call (`count`, `keys`, `get`, `first`, `get_multi`).
//!
//! # Multi-page retrieval
//!
//! [`Query::get_multi`] splits a large scan into pages of
//! [`EngineConfig::batch_size`](crate::EngineConfig) keys. One stage advances
//! the store cursor page by page (never concurrently) and feeds a bounded
//! queue; a pool of at most [`EngineConfig::workers`](crate::EngineConfig)
//! tasks hydrates pages from the cache, falling back to one batched store
//! read per page for the misses. Results are reassembled by page index.
//! Nested entities of the returned values carry their keys but are not
//! loaded; call [`Context::read`] for that.

use std::marker::PhantomData;
use std::sync::Arc;

use strata_codec::unflatten;
use strata_schema::{reference_name, Entity, FieldKind, Schema};
use strata_store::{Direction, Filter, FilterOp, Order, StoreError, StoreQuery};
use strata_types::{Key, PropertyList, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};

impl Context {
    /// Start a query over `T`'s kind.
    pub fn query<T: Entity>(&self) -> Query<'_, T> {
        let (schema, error) = match self.schema::<T>() {
            Ok(schema) => (Some(schema), None),
            Err(e) => (None, Some(e)),
        };
        Query {
            ctx: self,
            schema,
            store: StoreQuery::new(T::KIND),
            error,
            _entity: PhantomData,
        }
    }
}

/// A query over one entity type.
pub struct Query<'c, T: Entity> {
    ctx: &'c Context,
    schema: Option<Arc<Schema>>,
    store: StoreQuery,
    error: Option<Error>,
    _entity: PhantomData<fn() -> T>,
}

impl<'c, T: Entity> Query<'c, T> {
    /// Filter with the `"<field> <op>"` form, e.g. `with_field("Num >", 10)`.
    pub fn with_field(self, expr: &str, value: impl Into<Value>) -> Self {
        match Filter::parse(expr, value) {
            Ok(filter) => self.add_filter(filter, expr),
            Err(e) => self.fail(Error::InvalidFilter {
                kind: T::KIND,
                filter: expr.to_string(),
                reason: reason(e),
            }),
        }
    }

    /// Filter on a field (or plain sub-value path) with an explicit operator.
    pub fn filter(self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        let expr = format!("{field} {op}");
        self.add_filter(Filter::new(field, op, value), &expr)
    }

    /// Match entities whose nested entity or reference field `field` holds
    /// `target`'s key. `target` must be registered and keyed.
    pub fn with_modelable<R: Entity>(self, field: &str, target: &R) -> Self {
        match self.modelable_filter(field, target) {
            Ok(filter) => self.push_filter(filter),
            Err(e) => self.fail(e),
        }
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        if let Err(e) = self.check_property(field, field) {
            return self.fail(e);
        }
        self.store = self.store.order(Order::new(field, direction));
        self
    }

    pub fn offset_by(mut self, offset: usize) -> Self {
        self.store = self.store.offset(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.store = self.store.limit(limit);
        self
    }

    /// Number of matching entities, honouring offset and limit.
    pub async fn count(self) -> Result<usize> {
        let (ctx, _, query) = self.prepare()?;
        ctx.io(ctx.store().count(&query)).await
    }

    /// Keys of the matching entities, in query order.
    pub async fn keys(self) -> Result<Vec<Key>> {
        let (ctx, _, query) = self.prepare()?;
        scan_keys(ctx, &query.keys_only()).await
    }

    /// Every matching entity, fully read (nested entities included).
    ///
    /// Any failure discards the results gathered so far.
    pub async fn get(self) -> Result<Vec<T>> {
        let ctx = self.ctx;
        let keys = self.keys().await?;
        let mut entities: Vec<T> = keys.into_iter().map(keyed::<T>).collect();
        ctx.read_all(&mut entities).await?;
        Ok(entities)
    }

    /// Load the first matching entity into `entity`.
    pub async fn first(self, entity: &mut T) -> Result<()> {
        let ctx = self.ctx;
        let key = self
            .limit(1)
            .keys()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::EntityNotFound {
                kind: T::KIND,
                key: None,
            })?;
        *entity = keyed(key);
        ctx.read(entity).await
    }

    /// Every matching entity, retrieved page by page with concurrent
    /// hydration. See the module docs.
    pub async fn get_multi(self) -> Result<Vec<T>> {
        let (ctx, schema, query) = self.prepare()?;
        let total = ctx.io(ctx.store().count(&query)).await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let config = ctx.config();
        let batch = config.batch_size.max(1);
        let chunk = config.key_chunk.max(1);
        let pages = total.div_ceil(batch);
        let workers = config.workers.clamp(1, pages);
        debug!(query = %query, total, pages, workers, "multi-page retrieval");

        let scope = ctx.child();
        let (tx, rx) = mpsc::channel::<(usize, Vec<Key>)>(workers);
        let rx = Arc::new(Mutex::new(rx));
        let mut set = JoinSet::new();
        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let scope = scope.clone();
            let schema = Arc::clone(&schema);
            set.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some((page, keys)) = next else {
                        break;
                    };
                    done.push((page, hydrate_page::<T>(&scope, &schema, keys).await?));
                }
                Ok::<_, Error>(done)
            });
        }
        drop(rx);

        let produce = async {
            for page in 0..pages {
                let len = batch.min(total - page * batch);
                let keys = scan_page(&scope, &query, query.offset + page * batch, len, chunk).await?;
                if tx.send((page, keys)).await.is_err() {
                    // Every worker has stopped; the collector reports why.
                    break;
                }
            }
            drop(tx);
            Ok::<_, Error>(())
        };
        let collect = async {
            let mut slots: Vec<Option<Vec<T>>> = (0..pages).map(|_| None).collect();
            while let Some(joined) = set.join_next().await {
                let done = joined.map_err(|e| Error::Worker(e.to_string()))??;
                for (page, entities) in done {
                    slots[page] = Some(entities);
                }
            }
            Ok::<_, Error>(slots)
        };

        let outcome = tokio::try_join!(produce, collect);
        match outcome {
            Ok(((), slots)) => Ok(slots.into_iter().flatten().flatten().collect()),
            Err(e) => {
                scope.cancel();
                set.abort_all();
                debug!(error = %e, "multi-page retrieval aborted");
                Err(e)
            }
        }
    }

    fn prepare(self) -> Result<(&'c Context, Arc<Schema>, StoreQuery)> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let schema = self.schema.ok_or(Error::NotRegistered { kind: T::KIND })?;
        debug!(query = %self.store, "running query");
        Ok((self.ctx, schema, self.store))
    }

    fn fail(mut self, e: Error) -> Self {
        self.error.get_or_insert(e);
        self
    }

    fn push_filter(mut self, filter: Filter) -> Self {
        self.store = self.store.filter(filter);
        self
    }

    fn add_filter(self, filter: Filter, expr: &str) -> Self {
        match self.check_property(&filter.property, expr) {
            Ok(()) => self.push_filter(filter),
            Err(e) => self.fail(e),
        }
    }

    /// A filter or order must name a scalar or repeated field, or a sub-value
    /// of a plain field (`Nomo.Name`).
    fn check_property(&self, property: &str, expr: &str) -> Result<()> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        let (head, sub) = match property.split_once('.') {
            Some((head, sub)) => (head, Some(sub)),
            None => (property, None),
        };
        let field = schema.field(head).ok_or_else(|| Error::FieldNotFound {
            kind: T::KIND,
            field: head.to_string(),
        })?;
        let invalid = |reason: &str| Error::InvalidFilter {
            kind: T::KIND,
            filter: expr.to_string(),
            reason: reason.to_string(),
        };
        match (&field.kind, sub) {
            (FieldKind::Scalar | FieldKind::Repeated, None) => Ok(()),
            (FieldKind::Scalar | FieldKind::Repeated, Some(_)) => {
                Err(invalid("scalar fields have no sub-values"))
            }
            (FieldKind::Plain | FieldKind::PlainList, Some(_)) => Ok(()),
            (FieldKind::Plain | FieldKind::PlainList, None) => {
                Err(invalid("name a sub-value of the plain field"))
            }
            (FieldKind::Entity(_) | FieldKind::Reference { .. }, _) => {
                Err(invalid("filter nested entities and references with with_modelable"))
            }
        }
    }

    fn modelable_filter<R: Entity>(&self, field: &str, target: &R) -> Result<Filter> {
        if !target.model().is_registered() {
            return Err(Error::NotRegistered { kind: R::KIND });
        }
        let key = target
            .model()
            .key()
            .cloned()
            .ok_or(Error::KeyNotSet { kind: R::KIND })?;
        let Some(schema) = &self.schema else {
            return Err(Error::NotRegistered { kind: T::KIND });
        };
        let descriptor = schema.field(field).ok_or_else(|| Error::FieldNotFound {
            kind: T::KIND,
            field: field.to_string(),
        })?;
        let target_kind = match &descriptor.kind {
            FieldKind::Entity(nested) => nested.kind(),
            FieldKind::Reference { target } => *target,
            _ => {
                return Err(Error::InvalidFilter {
                    kind: T::KIND,
                    filter: field.to_string(),
                    reason: "not a nested entity or reference field".into(),
                })
            }
        };
        if target_kind != R::KIND {
            return Err(Error::InvalidFilter {
                kind: T::KIND,
                filter: field.to_string(),
                reason: format!("field holds {target_kind}, not {}", R::KIND),
            });
        }
        Ok(Filter::new(
            reference_name(T::KIND, field),
            FilterOp::Eq,
            Value::Key(key),
        ))
    }
}

fn reason(e: StoreError) -> String {
    match e {
        StoreError::InvalidQuery(reason) => reason,
        other => other.to_string(),
    }
}

fn keyed<T: Entity>(key: Key) -> T {
    let mut entity = T::default();
    entity.model_mut().set_key(key);
    entity
}

/// Run a keys-only query to exhaustion.
///
/// A store may end a run early at its per-request cap, so the scan resumes
/// from the cursor until a run yields nothing or the limit is reached.
async fn scan_keys(ctx: &Context, base: &StoreQuery) -> Result<Vec<Key>> {
    let mut keys = Vec::new();
    let mut query = base.clone();
    loop {
        let mut it = ctx.io(ctx.store().run(&query)).await?;
        let before = keys.len();
        while let Some(result) = ctx.io(it.next()).await? {
            keys.push(result.key);
        }
        if keys.len() == before {
            break;
        }
        query = query.start(it.cursor()).offset(0);
        if let Some(limit) = base.limit {
            if keys.len() >= limit {
                break;
            }
            query = query.limit(limit - keys.len());
        }
    }
    if let Some(limit) = base.limit {
        keys.truncate(limit);
    }
    Ok(keys)
}

/// Collect up to `len` keys starting `offset` results into the query, in
/// cursor round-trips of at most `chunk` keys.
async fn scan_page(
    ctx: &Context,
    base: &StoreQuery,
    offset: usize,
    len: usize,
    chunk: usize,
) -> Result<Vec<Key>> {
    let mut keys = Vec::with_capacity(len);
    let mut query = base.clone().keys_only().offset(offset).limit(chunk.min(len));
    while keys.len() < len {
        let mut it = ctx.io(ctx.store().run(&query)).await?;
        let before = keys.len();
        while let Some(result) = ctx.io(it.next()).await? {
            keys.push(result.key);
        }
        if keys.len() == before {
            break;
        }
        let remaining = len - keys.len();
        query = query.start(it.cursor()).offset(0).limit(chunk.min(remaining));
    }
    keys.truncate(len);
    Ok(keys)
}

/// Materialise one page: batched cache lookup, one batched store read for
/// the misses, then cache population.
async fn hydrate_page<T: Entity>(ctx: &Context, schema: &Schema, keys: Vec<Key>) -> Result<Vec<T>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let mut records = ctx.cache_get_multi(&keys).await?;
    let misses: Vec<Key> = keys
        .iter()
        .filter(|k| !records.contains_key(*k))
        .cloned()
        .collect();
    if !misses.is_empty() {
        let fetched = ctx.io(ctx.store().get_multi(&misses)).await?;
        let mut fill: Vec<(Key, PropertyList)> = Vec::with_capacity(misses.len());
        for (key, props) in misses.into_iter().zip(fetched) {
            let props = props.ok_or_else(|| Error::EntityNotFound {
                kind: T::KIND,
                key: Some(key.clone()),
            })?;
            fill.push((key, props));
        }
        ctx.cache_set_multi(&fill).await?;
        records.extend(fill);
    }
    debug!(kind = T::KIND, keys = keys.len(), "page hydrated");

    let mut entities = Vec::with_capacity(keys.len());
    for key in keys {
        let props = records.get(&key).ok_or_else(|| Error::EntityNotFound {
            kind: T::KIND,
            key: Some(key.clone()),
        })?;
        let mut entity: T = keyed(key);
        ctx.index(&mut entity)?;
        unflatten(props, schema, &mut entity)?;
        entities.push(entity);
    }
    Ok(entities)
}
