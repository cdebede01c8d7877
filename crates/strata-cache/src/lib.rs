//! Cache collaborator interface for strata.
//!
//! The cache tier is a best-effort accelerator in front of the store. The
//! engine stores encoded records under their encoded key and treats a miss,
//! and any [`CacheError`], as a signal to fall back to the store.
//!
//! # Modules
//!
//! - [`error`] -- Error types for cache operations
//! - [`traits`] -- The [`Cache`] trait defining the cache interface
//! - [`memory`] -- [`InMemoryCache`] for tests and embedding, and
//!   [`NoopCache`] for running without a cache tier

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use memory::{CacheStats, InMemoryCache, NoopCache};
pub use traits::Cache;
