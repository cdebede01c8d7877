//! Object-document mapping for strata.
//!
//! A [`Mapper`] binds a [`Datastore`] and a [`Cache`] together with a schema
//! registry and an [`EngineConfig`]. Each request runs through a
//! [`Context`], which carries cancellation and an optional deadline and
//! exposes the CRUD operations and the [`Query`] builder.
//!
//! ```ignore
//! let mapper = Mapper::new(Arc::new(InMemoryDatastore::new()), Arc::new(InMemoryCache::new()));
//! let ctx = mapper.context();
//!
//! let mut parent = Parent { name: "p".into(), num: 12, ..Default::default() };
//! ctx.create(&mut parent).await?;
//!
//! let big = ctx.query::<Parent>().with_field("Num >", 10).order_by("Num", Direction::Asc).get().await?;
//! ```
//!
//! # Storage layout
//!
//! Every entity of a graph is its own record, keyed under its own kind. A
//! parent record holds its scalar, repeated, and plain fields plus one key
//! property per nested entity or reference field. Nested entities are
//! written before their parent and loaded after it.

mod cache;
pub mod config;
pub mod context;
mod crud;
pub mod error;
pub mod query;

pub use config::EngineConfig;
pub use context::{Context, Mapper};
pub use error::{Error, Result};
pub use query::Query;

pub use strata_cache::{Cache, CacheError, InMemoryCache, NoopCache};
pub use strata_schema::{
    reference_name, Entity, FieldDecl, FieldMut, FieldRef, Keyed, Model, Modelable, PlainValue,
    Policy, Schema, SchemaError, SchemaRegistry,
};
pub use strata_store::{Datastore, Direction, FilterOp, InMemoryDatastore, StoreError};
pub use strata_types::{CastError, Key, Value, ValueType};

/// Everything needed to declare entities and run the engine.
pub mod prelude {
    pub use crate::{
        Context, Direction, Entity, FieldDecl, FieldMut, FieldRef, FilterOp, Key, Mapper, Model,
        Modelable, PlainValue, Value, ValueType,
    };
}
