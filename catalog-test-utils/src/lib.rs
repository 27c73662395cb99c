//! Catalog Test Utilities
//!
//! Shared test infrastructure for the catalog workspace:
//! - Proptest generators for drafts, patches, and identifiers
//! - Fixtures and an in-memory coordinator harness
//! - Assertions over `CatalogResult`

use std::sync::Arc;

pub use catalog_core::{
    CacheError, CatalogConfig, CatalogError, CatalogResult, ConfigError, Confirmation, NotFound,
    Record, RecordDraft, RecordId, RecordPatch, StoreError, Timestamp,
};
pub use catalog_storage::{
    CacheStore, CatalogCoordinator, DurableStore, InMemoryCache, InMemoryStore, KeySpace,
};

/// Install a test-friendly subscriber once per process.
///
/// Respects `RUST_LOG`; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// HARNESS
// ============================================================================

/// A coordinator over in-memory backends, with handles to both fakes.
pub struct Harness {
    pub coordinator: CatalogCoordinator<InMemoryStore, InMemoryCache>,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<InMemoryCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    /// # Panics
    ///
    /// Panics if `config` does not validate.
    pub fn with_config(config: CatalogConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let coordinator = CatalogCoordinator::new(store.clone(), cache.clone(), config)
            .expect("harness config must validate");
        Self {
            coordinator,
            store,
            cache,
        }
    }

    /// Index set members, sorted.
    pub async fn index_members(&self) -> Vec<String> {
        let mut members = self
            .cache
            .set_members(self.coordinator.keys().index_key())
            .await
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Whether the cache holds a live entry for `id`.
    pub fn has_entry(&self, id: RecordId) -> bool {
        self.cache
            .contains_key(&self.coordinator.keys().record_key(id))
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random record identifier.
    pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
        any::<[u8; 16]>().prop_map(|bytes| RecordId::new(Uuid::from_bytes(bytes)))
    }

    pub fn arb_name() -> impl Strategy<Value = String> {
        prop_oneof![
            "[A-Z][a-z]{2,20}",
            "[a-z]{3,10} [a-z]{3,10}",
            Just("A".to_string()),
            "[a-zA-Z0-9 ]{40,80}",
        ]
    }

    /// Prices stay within the BIGINT range the SQL backend accepts.
    pub fn arb_price() -> impl Strategy<Value = u64> {
        prop_oneof![Just(0u64), 1u64..100_000, 0u64..=i64::MAX as u64]
    }

    pub fn arb_text() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-z ]{1,60}", "\\PC{0,30}"]
    }

    /// Absent, empty, and populated image references.
    pub fn arb_image() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            "https://img\\.example\\.com/[a-z0-9]{4,12}\\.png".prop_map(Some),
        ]
    }

    pub fn arb_draft() -> impl Strategy<Value = RecordDraft> {
        (arb_name(), arb_price(), arb_text(), arb_text(), arb_image()).prop_map(
            |(name, price, description, category, image)| RecordDraft {
                name,
                price,
                description,
                category,
                image,
            },
        )
    }

    pub fn arb_patch() -> impl Strategy<Value = RecordPatch> {
        (
            proptest::option::of(arb_name()),
            proptest::option::of(arb_price()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_image()),
        )
            .prop_map(|(name, price, description, category, image)| RecordPatch {
                name,
                price,
                description,
                category,
                image,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made drafts for common scenarios.

    use super::*;

    pub fn minimal_draft() -> RecordDraft {
        RecordDraft::new("A", 100, "d", "c")
    }

    pub fn kettle() -> RecordDraft {
        RecordDraft::new("Kettle", 3500, "Electric kettle, 1.7l", "kitchen")
            .with_image("https://img.example.com/kettle.png")
    }

    pub fn toaster() -> RecordDraft {
        RecordDraft::new("Toaster", 2900, "Two-slot toaster", "kitchen")
    }

    /// Draft with an empty (not absent) image reference.
    pub fn blank_image() -> RecordDraft {
        RecordDraft::new("Lamp", 1200, "Desk lamp", "lighting").with_image("")
    }

    /// `n` distinct drafts.
    pub fn numbered(n: usize) -> Vec<RecordDraft> {
        (0..n)
            .map(|i| RecordDraft::new(format!("item-{}", i), i as u64 * 10, "numbered", "bulk"))
            .collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for catalog results.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::NotFound(_)) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Store(StoreError::Unavailable { .. })) => {}
            other => panic!("Expected store Unavailable, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_cache_unavailable<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Cache(CacheError::Unavailable { .. })) => {}
            other => panic!("Expected cache Unavailable, got: {:?}", other),
        }
    }

    /// Assert two record collections hold the same records, in any order.
    #[track_caller]
    pub fn assert_same_records(actual: &[Record], expected: &[Record]) {
        let mut actual = actual.to_vec();
        let mut expected = expected.to_vec();
        actual.sort_by_key(|r| r.id);
        expected.sort_by_key(|r| r.id);
        assert_eq!(actual, expected, "Record sets differ");
    }

    /// Assert `record` carries every field `patch` sets.
    #[track_caller]
    pub fn assert_patch_applied(record: &Record, patch: &RecordPatch) {
        if let Some(name) = &patch.name {
            assert_eq!(&record.name, name, "name not applied");
        }
        if let Some(price) = patch.price {
            assert_eq!(record.price, price, "price not applied");
        }
        if let Some(description) = &patch.description {
            assert_eq!(&record.description, description, "description not applied");
        }
        if let Some(category) = &patch.category {
            assert_eq!(&record.category, category, "category not applied");
        }
        if let Some(image) = &patch.image {
            assert_eq!(&record.image, image, "image not applied");
        }
    }
}
