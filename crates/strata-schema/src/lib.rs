//! Schema indexer for strata.
//!
//! Entity types describe themselves statically: [`Entity::fields`] returns a
//! list of [`FieldDecl`]s and [`Modelable`] exposes field access by name.
//! The [`SchemaRegistry`] turns a declaration into a [`Schema`] once per
//! type and caches it for the lifetime of the registry. Nested entity types
//! get their own independently cached schemas.
//!
//! # Field shapes
//!
//! - scalar and repeated scalar fields persist as (multi-valued) properties
//! - plain value fields ([`PlainValue`]) persist their own sub-values and are
//!   never recursed into by the indexer
//! - nested entity fields carry a [`Policy`] parsed from their annotation
//!   (`"zero"`, `"readonly"`, or none for `always`)
//! - reference fields hold the key of another entity type
//!
//! # Modules
//!
//! - [`model`] -- the [`Model`] marker every entity embeds
//! - [`entity`] -- the [`Entity`] / [`Modelable`] capabilities and field slots
//! - [`decl`] -- static field declarations
//! - [`schema`] -- computed descriptors and [`reference_name`]
//! - [`registry`] -- the compute-once [`SchemaRegistry`]

pub mod decl;
pub mod entity;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod model;
pub mod registry;
pub mod schema;

pub use decl::{FieldDecl, FieldShape, TypeDecl};
pub use entity::{
    Entity, FieldMut, FieldRef, Keyed, Modelable, PlainListSlot, PlainValue, ValueSlot, ValuesSlot,
};
pub use error::SchemaError;
pub use model::Model;
pub use registry::SchemaRegistry;
pub use schema::{reference_name, FieldDescriptor, FieldKind, Policy, Schema};
