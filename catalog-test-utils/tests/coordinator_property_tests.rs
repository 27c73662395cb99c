//! Property-Based Tests for the Cache-Aside Coordinator
//!
//! Every test runs the coordinator over the in-memory store and cache, with
//! outages simulated by flipping the fakes' availability.

use catalog_test_utils::assertions::*;
use catalog_test_utils::generators::*;
use catalog_test_utils::*;
use futures_util::future::join_all;
use proptest::prelude::*;
use std::time::Duration;

fn fail(e: CatalogError) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A read-through miss leaves the entry warm: the second read succeeds
    /// with the durable store unreachable.
    #[test]
    fn prop_read_through_fills_cache(draft in arb_draft()) {
        runtime().block_on(async {
            let h = Harness::new();
            let stored = h.store.insert(&draft).await.map_err(fail)?;
            prop_assert!(!h.has_entry(stored.id));

            let first = h.coordinator.get(stored.id).await.map_err(fail)?;
            prop_assert_eq!(&first, &stored);

            h.store.set_available(false);
            let second = h.coordinator.get(stored.id).await.map_err(fail)?;
            prop_assert_eq!(&second, &stored);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// After a delete, neither the read-through nor the cache-only read finds
    /// the record.
    #[test]
    fn prop_delete_is_terminal(draft in arb_draft(), warm in any::<bool>()) {
        runtime().block_on(async {
            let h = Harness::new();
            let created = h.coordinator.create(draft).await.map_err(fail)?;
            if warm {
                h.coordinator.get(created.id).await.map_err(fail)?;
            }

            let confirmation = h.coordinator.delete(created.id).await.map_err(fail)?;
            prop_assert_eq!(confirmation, Confirmation::Deleted(created.id));

            prop_assert!(h.coordinator.get(created.id).await.unwrap_err().is_not_found());
            prop_assert!(h.coordinator.cached_get(created.id).await.unwrap_err().is_not_found());
            prop_assert!(!h.index_members().await.contains(&created.id.to_string()));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// An update is visible on the next read, served from a repopulated entry.
    #[test]
    fn prop_update_repopulates(draft in arb_draft(), patch in arb_patch()) {
        runtime().block_on(async {
            let h = Harness::new();
            let created = h.coordinator.create(draft).await.map_err(fail)?;

            h.coordinator.update(created.id, patch.clone()).await.map_err(fail)?;

            h.store.set_available(false);
            let read = h.coordinator.get(created.id).await.map_err(fail)?;
            assert_patch_applied(&read, &patch);
            prop_assert_eq!(read.id, created.id);
            prop_assert_eq!(read.created_at, created.created_at);

            let cached = h.coordinator.cached_get(created.id).await.map_err(fail)?;
            prop_assert_eq!(cached, read);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// With a cold cache, listing returns exactly the stored records and
    /// leaves exactly their identifiers in the index set.
    #[test]
    fn prop_index_bootstrap(drafts in prop::collection::vec(arb_draft(), 1..12)) {
        runtime().block_on(async {
            let h = Harness::new();
            let mut stored = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                stored.push(h.store.insert(draft).await.map_err(fail)?);
            }

            let listed = h.coordinator.list().await.map_err(fail)?;
            assert_same_records(&listed, &stored);

            let mut expected: Vec<String> = stored.iter().map(|r| r.id.to_string()).collect();
            expected.sort();
            prop_assert_eq!(h.index_members().await, expected);
            for record in &stored {
                prop_assert!(h.has_entry(record.id));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Creating through the coordinator keeps list and the cache-only list in
    /// agreement with the store.
    #[test]
    fn prop_created_records_are_listed(drafts in prop::collection::vec(arb_draft(), 1..8)) {
        runtime().block_on(async {
            let h = Harness::new();
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                created.push(h.coordinator.create(draft).await.map_err(fail)?);
            }

            let listed = h.coordinator.list().await.map_err(fail)?;
            assert_same_records(&listed, &created);

            let cached = h.coordinator.cached_list().await.map_err(fail)?;
            assert_same_records(&cached, &created);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Cache outages never fail a mutation the store accepted.
    #[test]
    fn prop_cache_outage_is_invisible_to_writes(draft in arb_draft(), patch in arb_patch()) {
        runtime().block_on(async {
            let h = Harness::new();
            h.cache.set_available(false);

            let created = h.coordinator.create(draft).await.map_err(fail)?;
            h.coordinator.update(created.id, patch.clone()).await.map_err(fail)?;
            let read = h.coordinator.get(created.id).await.map_err(fail)?;
            assert_patch_applied(&read, &patch);
            h.coordinator.delete(created.id).await.map_err(fail)?;

            prop_assert!(h.store.is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A store failure on a mutation leaves the cache exactly as it was.
    #[test]
    fn prop_store_outage_leaves_cache_untouched(draft in arb_draft(), patch in arb_patch()) {
        runtime().block_on(async {
            let h = Harness::new();
            let created = h.coordinator.create(draft).await.map_err(fail)?;
            let members = h.index_members().await;
            h.store.set_available(false);

            assert_store_unavailable(&h.coordinator.create(fixtures::kettle()).await);
            assert_store_unavailable(&h.coordinator.update(created.id, patch).await);
            assert_store_unavailable(&h.coordinator.delete(created.id).await);

            prop_assert_eq!(h.index_members().await, members);
            let cached = h.coordinator.cached_get(created.id).await.map_err(fail)?;
            prop_assert_eq!(cached, created);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Unknown identifiers are NotFound on every point operation.
    #[test]
    fn prop_unknown_ids_not_found(id in arb_record_id(), patch in arb_patch()) {
        runtime().block_on(async {
            let h = Harness::new();
            h.coordinator.create(fixtures::toaster()).await.map_err(fail)?;

            assert_not_found(&h.coordinator.get(id).await);
            assert_not_found(&h.coordinator.update(id, patch).await);
            assert_not_found(&h.coordinator.delete(id).await);
            assert_not_found(&h.coordinator.cached_get(id).await);
            prop_assert!(!h.has_entry(id));
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// ============================================================================
// EXAMPLE-BASED TESTS
// ============================================================================

#[tokio::test]
async fn test_create_then_read_without_store() {
    init_test_tracing();
    let h = Harness::new();

    let created = h.coordinator.create(fixtures::minimal_draft()).await.unwrap();
    assert!(!created.id.as_uuid().is_nil());
    assert_eq!(created.price, 100);

    h.store.set_available(false);
    let read = h.coordinator.get(created.id).await.unwrap();
    assert_eq!(read.price, 100);
}

#[tokio::test]
async fn test_list_on_empty_catalog_is_not_found() {
    let h = Harness::new();
    let result = h.coordinator.list().await;
    assert_not_found(&result);
    assert!(matches!(result, Err(CatalogError::NotFound(NotFound::Catalog))));
    assert!(h.cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cache_entries_do_not_outlive_ttl() {
    let ttl = Duration::from_secs(30);
    let h = Harness::with_config(CatalogConfig::new().with_ttl(ttl));
    let created = h.coordinator.create(fixtures::kettle()).await.unwrap();

    tokio::time::advance(ttl - Duration::from_secs(1)).await;
    assert_eq!(h.coordinator.cached_get(created.id).await.unwrap(), created);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_not_found(&h.coordinator.cached_get(created.id).await);
    assert_not_found(&h.coordinator.cached_list().await);
    assert!(h.cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_expired_index_is_rebuilt_on_list() {
    let h = Harness::new();
    let a = h.coordinator.create(fixtures::kettle()).await.unwrap();
    let b = h.coordinator.create(fixtures::toaster()).await.unwrap();

    tokio::time::advance(Duration::from_secs(3601)).await;
    assert!(h.index_members().await.is_empty());

    let listed = h.coordinator.list().await.unwrap();
    assert_same_records(&listed, &[a.clone(), b.clone()]);
    assert_eq!(h.index_members().await.len(), 2);
    assert!(h.has_entry(a.id) && h.has_entry(b.id));
}

#[tokio::test]
async fn test_empty_and_absent_images_survive_the_cache() {
    let h = Harness::new();
    let blank = h.coordinator.create(fixtures::blank_image()).await.unwrap();
    let absent = h.coordinator.create(fixtures::toaster()).await.unwrap();

    h.store.set_available(false);
    assert_eq!(h.coordinator.get(blank.id).await.unwrap().image, Some(String::new()));
    assert_eq!(h.coordinator.get(absent.id).await.unwrap().image, None);
}

#[tokio::test]
async fn test_update_can_clear_image() {
    let h = Harness::new();
    let created = h.coordinator.create(fixtures::kettle()).await.unwrap();

    h.coordinator
        .update(created.id, RecordPatch::new().image(None))
        .await
        .unwrap();

    assert_eq!(h.coordinator.get(created.id).await.unwrap().image, None);
}

#[tokio::test]
async fn test_cache_flush_is_recovered_by_reads() {
    let h = Harness::new();
    let created: Vec<Record> = {
        let mut out = Vec::new();
        for draft in fixtures::numbered(4) {
            out.push(h.coordinator.create(draft).await.unwrap());
        }
        out
    };

    h.cache.clear();
    assert_not_found(&h.coordinator.cached_list().await);

    let listed = h.coordinator.list().await.unwrap();
    assert_same_records(&listed, &created);
    let cached = h.coordinator.cached_list().await.unwrap();
    assert_same_records(&cached, &created);
}

#[tokio::test]
async fn test_diagnostics_surface_cache_outage() {
    let h = Harness::new();
    let created = h.coordinator.create(fixtures::kettle()).await.unwrap();
    h.cache.set_available(false);

    assert_cache_unavailable(&h.coordinator.cached_get(created.id).await);
    assert_cache_unavailable(&h.coordinator.cached_list().await);
    assert_eq!(h.coordinator.list().await.unwrap(), vec![created]);
}

#[tokio::test]
async fn test_concurrent_creates_all_land_in_index() {
    let h = Harness::new();
    let creates = fixtures::numbered(16)
        .into_iter()
        .map(|draft| h.coordinator.create(draft));
    let created: Vec<Record> = join_all(creates)
        .await
        .into_iter()
        .collect::<CatalogResult<_>>()
        .unwrap();

    assert_eq!(h.index_members().await.len(), 16);
    let listed = h.coordinator.cached_list().await.unwrap();
    assert_same_records(&listed, &created);
}
