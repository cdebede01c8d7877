//! Store collaborator interface for strata.
//!
//! The mapping engine never talks to a concrete store. It consumes the
//! [`Datastore`] trait, which models a schemaless hierarchical key-value store
//! with property-level secondary indexes: keyed get/put/delete (single and
//! batched), key allocation per kind, and forward-only cursor queries.
//!
//! # Storage Backends
//!
//! - [`InMemoryDatastore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Query Semantics
//!
//! 1. A filter on a multi-valued property matches when ANY of its values
//!    satisfies the filter, so two equality filters on the same repeated
//!    property match records holding both values.
//! 2. Ordering by a multi-valued property uses its smallest value ascending
//!    and its largest value descending; records missing an order property
//!    are excluded from the result.
//! 3. Iteration ends with `Ok(None)`, the "no more results" sentinel. Every
//!    `Err` is a real failure.

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDatastore;
pub use query::{Direction, Filter, FilterOp, Order, StoreQuery};
pub use traits::{Datastore, QueryIterator, QueryResult};
