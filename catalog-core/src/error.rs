//! Error types for catalog operations

use crate::RecordId;
use std::fmt;
use thiserror::Error;

/// What a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// A single record identifier.
    Record(RecordId),
    /// Any record at all (list operations).
    Catalog,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => write!(f, "record {}", id),
            Self::Catalog => f.write_str("no records exist"),
        }
    }
}

/// Durable store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Durable store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("Row decode failed: {reason}")]
    Decode { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Wrong value type at key {key}")]
    WrongType { key: String },

    #[error("Codec error at key {key}: {reason}")]
    Codec { key: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all catalog errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(NotFound),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CatalogError {
    pub fn record_not_found(id: RecordId) -> Self {
        Self::NotFound(NotFound::Record(id))
    }

    pub fn catalog_empty() -> Self {
        Self::NotFound(NotFound::Catalog)
    }

    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::Store(StoreError::Unavailable {
            reason: reason.into(),
        })
    }

    pub fn cache_unavailable(reason: impl Into<String>) -> Self {
        Self::Cache(CacheError::Unavailable {
            reason: reason.into(),
        })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable { .. }))
    }

    pub fn is_cache_unavailable(&self) -> bool {
        matches!(self, Self::Cache(CacheError::Unavailable { .. }))
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_display_names_record() {
        let err = CatalogError::record_not_found(RecordId::new(Uuid::nil()));
        let msg = format!("{}", err);
        assert!(msg.contains("Not found"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_catalog_empty_is_not_found() {
        let err = CatalogError::catalog_empty();
        assert!(err.is_not_found());
        assert_eq!(format!("{}", err), "Not found: no records exist");
    }

    #[test]
    fn test_from_store_error() {
        let err: CatalogError = StoreError::WriteFailed {
            reason: "constraint".to_string(),
        }
        .into();
        assert!(matches!(err, CatalogError::Store(StoreError::WriteFailed { .. })));
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_predicates() {
        assert!(CatalogError::store_unavailable("down").is_store_unavailable());
        assert!(CatalogError::cache_unavailable("down").is_cache_unavailable());
        assert!(!CatalogError::cache_unavailable("down").is_not_found());
    }

    #[test]
    fn test_codec_error_display() {
        let err = CacheError::Codec {
            key: "record:x".to_string(),
            reason: "eof".to_string(),
        };
        assert_eq!(format!("{}", err), "Codec error at key record:x: eof");
    }
}
