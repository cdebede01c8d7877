//! Foundation types for strata.
//!
//! This crate provides the data model shared by every other strata crate: the
//! store-assigned [`Key`], the scalar [`Value`] held by a property, the flat
//! [`PropertyList`] an entity is persisted as, and the opaque [`Cursor`] used
//! to resume forward scans.
//!
//! # Key Types
//!
//! - [`Key`] -- Opaque identifier assigned by the store on first create
//! - [`Value`] -- A single scalar property value
//! - [`ValueType`] -- Conversion between Rust field types and [`Value`]
//! - [`Property`] / [`PropertyList`] -- The flat, path-addressed record form
//! - [`Cursor`] -- Forward-only scan position

pub mod cursor;
pub mod error;
pub mod key;
pub mod property;
pub mod value;

pub use cursor::Cursor;
pub use error::CastError;
pub use key::Key;
pub use property::{Property, PropertyList};
pub use value::{Value, ValueType};
