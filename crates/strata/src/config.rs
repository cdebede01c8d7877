use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine tuning.
///
/// ```toml
/// batch_size = 1000
/// key_chunk = 200
/// workers = 8
/// cache_enabled = true
/// operation_timeout_ms = 30000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entities per page in multi-page retrieval.
    pub batch_size: usize,
    /// Keys fetched per cursor round-trip while scanning a page.
    pub key_chunk: usize,
    /// Upper bound on concurrent page hydration workers.
    pub workers: usize,
    /// When `false` the cache tier is bypassed entirely.
    pub cache_enabled: bool,
    /// Deadline applied to every context the mapper hands out.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            key_chunk: 200,
            workers: 8,
            cache_enabled: true,
            operation_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        if self.key_chunk == 0 {
            return Err(Error::Config("key_chunk must be positive".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}
