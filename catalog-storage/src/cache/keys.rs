//! Cache key layout.
//!
//! Every key the coordinator touches lives under one prefix:
//!
//! - `<prefix>:<id>` holds a serialized record
//! - `<prefix>:ids` holds the index set of all known record identifiers
//!
//! Record identifiers are UUIDs, so the literal `ids` suffix can never collide
//! with a record key.

use catalog_core::{CatalogConfig, RecordId};

/// Suffix of the index set key.
const INDEX_SUFFIX: &str = "ids";

/// Key namespace derived from [`CatalogConfig::key_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
    index_key: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let index_key = format!("{}:{}", prefix, INDEX_SUFFIX);
        Self { prefix, index_key }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.key_prefix.clone())
    }

    /// Key of the cache entry for one record.
    pub fn record_key(&self, id: RecordId) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Key of the index set.
    pub fn index_key(&self) -> &str {
        &self.index_key
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_default_layout() {
        let keys = KeySpace::default();
        let id = RecordId::new(Uuid::nil());
        assert_eq!(keys.index_key(), "record:ids");
        assert_eq!(
            keys.record_key(id),
            "record:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_custom_prefix_layout() {
        let keys = KeySpace::new("product");
        let id = RecordId::generate();
        assert_eq!(keys.index_key(), "product:ids");
        assert_eq!(keys.record_key(id), format!("product:{}", id));
        assert_ne!(keys.record_key(id), keys.index_key());
    }
}
