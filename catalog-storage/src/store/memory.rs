//! In-memory durable store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use catalog_core::{
    CatalogError, CatalogResult, Record, RecordDraft, RecordId, RecordPatch, StoreError,
};
use chrono::Utc;

use super::DurableStore;

/// In-memory store keyed by record identifier.
#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<HashMap<RecordId, Record>>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryStore {
    /// Create a new, empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the database going away (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Get count of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }

    fn check_available(&self) -> CatalogResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CatalogError::store_unavailable(
                "in-memory store marked unavailable",
            ))
        }
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, HashMap<RecordId, Record>>> {
        self.check_available()?;
        self.records
            .read()
            .map_err(|_| CatalogError::Store(StoreError::LockPoisoned))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, HashMap<RecordId, Record>>> {
        self.check_available()?;
        self.records
            .write()
            .map_err(|_| CatalogError::Store(StoreError::LockPoisoned))
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn insert(&self, draft: &RecordDraft) -> CatalogResult<Record> {
        let mut records = self.write()?;
        let id = RecordId::generate();
        if records.contains_key(&id) {
            return Err(StoreError::WriteFailed {
                reason: format!("duplicate id {}", id),
            }
            .into());
        }
        let record = Record::from_draft(id, draft.clone(), Utc::now());
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: RecordId) -> CatalogResult<Option<Record>> {
        let records = self.read()?;
        Ok(records.get(&id).cloned())
    }

    async fn find_all(&self) -> CatalogResult<Vec<Record>> {
        let records = self.read()?;
        Ok(records.values().cloned().collect())
    }

    async fn update_by_id(&self, id: RecordId, patch: &RecordPatch) -> CatalogResult<u64> {
        let mut records = self.write()?;
        match records.get_mut(&id) {
            Some(record) => {
                record.apply(patch, Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, id: RecordId) -> CatalogResult<u64> {
        let mut records = self.write()?;
        Ok(u64::from(records.remove(&id).is_some()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_draft() -> RecordDraft {
        RecordDraft::new("Kettle", 3500, "Electric kettle", "kitchen")
    }

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let store = InMemoryStore::new();
        let a = store.insert(&make_test_draft()).await.unwrap();
        let b = store.insert(&make_test_draft()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = InMemoryStore::new();
        let record = store.insert(&make_test_draft()).await.unwrap();

        assert_eq!(store.find_by_id(record.id).await.unwrap(), Some(record));
        assert_eq!(store.find_by_id(RecordId::generate()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_reports_affected_rows() {
        let store = InMemoryStore::new();
        let record = store.insert(&make_test_draft()).await.unwrap();

        let affected = store
            .update_by_id(record.id, &RecordPatch::new().name("Kettle v2"))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let updated = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Kettle v2");
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= record.updated_at);

        let missing = store
            .update_by_id(RecordId::generate(), &RecordPatch::new().price(1))
            .await
            .unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn test_delete_reports_affected_rows() {
        let store = InMemoryStore::new();
        let record = store.insert(&make_test_draft()).await.unwrap();

        assert_eq!(store.delete_by_id(record.id).await.unwrap(), 1);
        assert_eq!(store.delete_by_id(record.id).await.unwrap(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryStore::new();
        store.set_available(false);

        let err = store.insert(&make_test_draft()).await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(store.find_all().await.unwrap_err().is_store_unavailable());
    }
}
