//! Catalog Core - Entity Types
//!
//! Pure data structures shared by every catalog crate: records and their
//! drafts and patches, the error taxonomy, configuration, and the cache codec.
//! No I/O lives here.

pub mod codec;
pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use codec::{decode_record, encode_record};
pub use config::{CatalogConfig, DEFAULT_KEY_PREFIX, DEFAULT_RECORD_TTL};
pub use entities::{Confirmation, Record, RecordDraft, RecordPatch};
pub use error::{CacheError, CatalogError, CatalogResult, ConfigError, NotFound, StoreError};
pub use identity::{RecordId, Timestamp};
