//! Create, read, update, and delete over entity graphs.
//!
//! Nested entities are persisted children-first so the parent record can
//! carry their keys, and are loaded parent-first by following those keys.
//! A failure part-way through a cascade is returned as-is; writes already
//! applied to other records of the graph are not rolled back.

use std::future::Future;
use std::pin::Pin;

use strata_codec::{flatten, is_empty, plan, unflatten, NestedAction, WriteMode};
use strata_schema::{Entity, FieldMut, FieldRef, Keyed, Modelable, Schema};
use strata_types::{Key, PropertyList};
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl Context {
    /// Persist a new entity graph.
    ///
    /// Nested entities are written first according to their policy, then the
    /// entity receives a key (unless it already has one) and its record is
    /// written to the store and the cache.
    pub async fn create<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let schema = self.index(entity)?;
        self.persist(entity, &schema, WriteMode::Create).await
    }

    /// Load the entity stored under the entity's key, cache first.
    pub async fn read<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let schema = self.index(entity)?;
        let key = entity
            .model()
            .key()
            .cloned()
            .ok_or(Error::KeyNotSet { kind: T::KIND })?;
        let props = self
            .load_record(&key)
            .await?
            .ok_or(Error::EntityNotFound {
                kind: T::KIND,
                key: Some(key),
            })?;
        self.hydrate(entity, &schema, &props).await
    }

    /// Read several keyed entities of one type, stopping at the first error.
    pub async fn read_all<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        for entity in entities {
            self.read(entity).await?;
        }
        Ok(())
    }

    /// Rewrite a persisted entity graph.
    ///
    /// Read-only children that already exist are left untouched. A `zero`
    /// child that became empty has its stored records deleted and its keys
    /// cleared; one that became non-empty is created.
    pub async fn update<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let schema = self.index(entity)?;
        if !entity.model().has_key() {
            return Err(Error::KeyNotSet { kind: T::KIND });
        }
        self.persist(entity, &schema, WriteMode::Update).await
    }

    /// Delete the records of `targets` and evict them from the cache.
    ///
    /// Only the named records go: deleting a nested entity leaves its parent
    /// (and the parent's now dangling key property) in place. Every target
    /// must be keyed; nothing is deleted otherwise.
    pub async fn delete(&self, targets: &[&dyn Keyed]) -> Result<()> {
        let keys = targets
            .iter()
            .map(|t| t.key().cloned().ok_or(Error::KeyNotSet { kind: t.kind() }))
            .collect::<Result<Vec<Key>>>()?;
        if keys.is_empty() {
            return Ok(());
        }
        self.cache_evict(&keys).await?;
        self.io(self.store().delete_multi(&keys)).await?;
        // A read racing the delete may have repopulated the cache.
        self.cache_evict(&keys).await?;
        debug!(count = keys.len(), "entities deleted");
        Ok(())
    }

    /// Cache first; a store hit repopulates the cache.
    pub(crate) async fn load_record(&self, key: &Key) -> Result<Option<PropertyList>> {
        if let Some(props) = self.cache_get(key).await? {
            return Ok(Some(props));
        }
        let Some(props) = self.io(self.store().get(key)).await? else {
            return Ok(None);
        };
        self.cache_set(key, &props).await?;
        Ok(Some(props))
    }

    fn persist<'a>(
        &'a self,
        entity: &'a mut dyn Modelable,
        schema: &'a Schema,
        mode: WriteMode,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for field in schema.fields() {
                let Some(nested) = field.nested() else {
                    continue;
                };
                let child = nested_mut(entity, schema, field.name)?;
                let keyed = child.model().has_key();
                let empty = is_empty(child, nested)?;
                match plan(field.policy, mode, empty, keyed) {
                    NestedAction::Write => {
                        let child_mode = if keyed { mode } else { WriteMode::Create };
                        self.persist(child, nested, child_mode).await?;
                    }
                    NestedAction::Skip => {}
                    NestedAction::Discard => self.discard(child, nested).await?,
                    NestedAction::Detach => clear_keys(child, nested)?,
                }
            }

            let key = match entity.model().key() {
                Some(key) => {
                    let key = key.clone();
                    // Drop the old cached record before the store changes.
                    self.cache_evict(std::slice::from_ref(&key)).await?;
                    key
                }
                None => self.io(self.store().allocate_key(schema.kind())).await?,
            };
            let props = flatten(entity, schema)?;
            self.io(self.store().put(&key, &props)).await?;
            self.cache_set(&key, &props).await?;
            debug!(kind = schema.kind(), key = %key, ?mode, "entity written");
            entity.model_mut().set_key(key);
            Ok(())
        })
    }

    /// Delete a child's stored subtree and forget its keys.
    async fn discard(&self, child: &mut dyn Modelable, schema: &Schema) -> Result<()> {
        let mut keys = Vec::new();
        collect_keys(child, schema, &mut keys)?;
        if !keys.is_empty() {
            self.cache_evict(&keys).await?;
            self.io(self.store().delete_multi(&keys)).await?;
            self.cache_evict(&keys).await?;
            debug!(kind = schema.kind(), count = keys.len(), "empty child discarded");
        }
        clear_keys(child, schema)
    }

    fn hydrate<'a>(
        &'a self,
        entity: &'a mut dyn Modelable,
        schema: &'a Schema,
        props: &'a PropertyList,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            unflatten(props, schema, entity)?;
            for field in schema.fields() {
                let Some(nested) = field.nested() else {
                    continue;
                };
                let child = nested_mut(entity, schema, field.name)?;
                let Some(key) = child.model().key().cloned() else {
                    reset(child, nested)?;
                    continue;
                };
                match self.load_record(&key).await? {
                    Some(child_props) => self.hydrate(child, nested, &child_props).await?,
                    None => {
                        warn!(kind = schema.kind(), field = field.name, key = %key, "dangling nested key");
                        reset(child, nested)?;
                    }
                }
            }
            Ok(())
        })
    }
}

fn nested_mut<'e>(
    entity: &'e mut dyn Modelable,
    schema: &Schema,
    field: &'static str,
) -> Result<&'e mut dyn Modelable> {
    match entity.field_mut(field) {
        Some(FieldMut::Entity(child)) => Ok(child),
        _ => Err(Error::FieldNotFound {
            kind: schema.kind(),
            field: field.to_string(),
        }),
    }
}

/// Zero every field of the graph below `entity`, keeping `entity`'s own key.
fn reset(entity: &mut dyn Modelable, schema: &Schema) -> Result<()> {
    unflatten(&PropertyList::new(), schema, entity)?;
    for field in schema.fields() {
        if let Some(nested) = field.nested() {
            reset(nested_mut(entity, schema, field.name)?, nested)?;
        }
    }
    Ok(())
}

fn collect_keys(entity: &dyn Modelable, schema: &Schema, keys: &mut Vec<Key>) -> Result<()> {
    if let Some(key) = entity.model().key() {
        keys.push(key.clone());
    }
    for field in schema.fields() {
        let Some(nested) = field.nested() else {
            continue;
        };
        match entity.field(field.name) {
            Some(FieldRef::Entity(child)) => collect_keys(child, nested, keys)?,
            _ => {
                return Err(Error::FieldNotFound {
                    kind: schema.kind(),
                    field: field.name.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn clear_keys(entity: &mut dyn Modelable, schema: &Schema) -> Result<()> {
    entity.model_mut().clear_key();
    for field in schema.fields() {
        if let Some(nested) = field.nested() {
            clear_keys(nested_mut(entity, schema, field.name)?, nested)?;
        }
    }
    Ok(())
}
