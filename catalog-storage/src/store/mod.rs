//! Durable store abstraction.
//!
//! The durable store is the source of truth for records. It assigns record
//! identity on insert and reports how many rows a point update or delete
//! touched, which the coordinator uses to decide between success and
//! `NotFound`.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgStore, PgStoreConfig};

use async_trait::async_trait;
use catalog_core::{CatalogResult, Record, RecordDraft, RecordId, RecordPatch};

/// Async durable store for catalog records.
///
/// Failures are reported as `CatalogError::Store`: `Unavailable` when the
/// backing service could not be reached, `WriteFailed` when it rejected a
/// write.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Insert a new record, assigning its identifier and timestamps.
    async fn insert(&self, draft: &RecordDraft) -> CatalogResult<Record>;

    /// Get a record by ID.
    async fn find_by_id(&self, id: RecordId) -> CatalogResult<Option<Record>>;

    /// List every record. Order is unspecified.
    async fn find_all(&self) -> CatalogResult<Vec<Record>>;

    /// Apply a partial update. Returns the number of records affected.
    async fn update_by_id(&self, id: RecordId, patch: &RecordPatch) -> CatalogResult<u64>;

    /// Delete a record. Returns the number of records affected.
    async fn delete_by_id(&self, id: RecordId) -> CatalogResult<u64>;
}
