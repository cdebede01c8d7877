//! Entity codec for strata.
//!
//! Pure conversion between entity instances and the property lists the
//! store holds. Every entity, nested or not, is its own record: a parent's
//! record carries its scalar, repeated, and plain fields plus one key
//! property per nested entity or reference field, named by
//! [`reference_name`](strata_schema::reference_name).
//!
//! - [`flatten`] / [`unflatten`] -- one entity's own record
//! - [`is_empty`] -- zero-value test used by the `zero` policy
//! - [`plan`] -- what a nested entity needs on create or update

mod error;
mod flatten;
mod plan;

pub use error::{CodecError, CodecResult};
pub use flatten::{flatten, is_empty, unflatten};
pub use plan::{plan, NestedAction, WriteMode};
