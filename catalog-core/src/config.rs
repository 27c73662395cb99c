//! Configuration types
//!
//! Loaded from environment variables with defaults matching the production
//! deployment: one hour TTL and the `record` key prefix.

use crate::{CatalogResult, ConfigError};
use std::time::Duration;

/// Default lifetime of cache entries and of the index set.
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(3600);

/// Default prefix for every cache key the coordinator touches.
pub const DEFAULT_KEY_PREFIX: &str = "record";

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// TTL applied to `<prefix>:<id>` entries and to the index set.
    pub record_ttl: Duration,
    /// Key namespace, e.g. `record` yields `record:<id>` and `record:ids`.
    pub key_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            record_ttl: DEFAULT_RECORD_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CATALOG_RECORD_TTL_SECS`: TTL in seconds (default: 3600)
    /// - `CATALOG_KEY_PREFIX`: cache key prefix (default: "record")
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("CATALOG_RECORD_TTL_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "CATALOG_RECORD_TTL_SECS".to_string(),
                value: raw.clone(),
                reason: "expected a whole number of seconds".to_string(),
            })?;
            config.record_ttl = Duration::from_secs(secs);
        }

        if let Some(prefix) = lookup("CATALOG_KEY_PREFIX") {
            config.key_prefix = prefix.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the coordinator cannot run with.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.record_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "record_ttl".to_string(),
                value: "0".to_string(),
                reason: "cache entries must expire after a positive duration".to_string(),
            }
            .into());
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "key_prefix".to_string(),
            }
            .into());
        }
        if self.key_prefix.contains(':') {
            return Err(ConfigError::InvalidValue {
                field: "key_prefix".to_string(),
                value: self.key_prefix.clone(),
                reason: "must not contain ':'".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
