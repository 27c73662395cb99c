//! Cache-aside coordinator.
//!
//! All record access goes through [`CatalogCoordinator`]. Mutations hit the
//! durable store first and are then mirrored into the cache; reads consult the
//! cache first and repair it on the way out.
//!
//! # Failure policy
//!
//! - Durable store failures on authoritative paths propagate to the caller.
//! - Cache failures on read-through and mirroring paths are logged and
//!   swallowed. A cache that cannot be read is treated as a miss.
//! - Only the cache-only projections ([`CatalogCoordinator::cached_get`],
//!   [`CatalogCoordinator::cached_list`]) surface cache failures.
//!
//! # Concurrency
//!
//! No locks are taken. Two writers racing on the same identifier can leave
//! the loser's snapshot in the cache until its TTL runs out.

use std::future::Future;
use std::sync::Arc;

use catalog_core::{
    decode_record, encode_record, CatalogConfig, CatalogError, CatalogResult, Confirmation,
    Record, RecordDraft, RecordId, RecordPatch,
};
use futures_util::future::join_all;

use crate::cache::{CacheStore, KeySpace};
use crate::store::DurableStore;

/// Outcome of resolving one index member during `list`.
enum Resolved {
    Found(Record),
    /// The member no longer names a stored record and was removed from the index.
    Pruned,
    /// The store could not be asked; the member stays indexed.
    Dropped,
}

/// Coordinates a durable store and a cache under the cache-aside protocol.
///
/// # Type Parameters
///
/// - `S`: the durable store, source of truth
/// - `C`: the cache backend
///
/// # Example
///
/// ```ignore
/// let coordinator = CatalogCoordinator::new(store, cache, CatalogConfig::from_env()?)?;
///
/// let record = coordinator.create(RecordDraft::new("A", 100, "d", "c")).await?;
/// let again = coordinator.get(record.id).await?; // served from the cache
/// ```
pub struct CatalogCoordinator<S, C>
where
    S: DurableStore,
    C: CacheStore,
{
    store: Arc<S>,
    cache: Arc<C>,
    config: CatalogConfig,
    keys: KeySpace,
}

impl<S, C> CatalogCoordinator<S, C>
where
    S: DurableStore,
    C: CacheStore,
{
    /// Create a coordinator over the given collaborators.
    pub fn new(store: Arc<S>, cache: Arc<C>, config: CatalogConfig) -> CatalogResult<Self> {
        config.validate()?;
        let keys = KeySpace::from_config(&config);
        Ok(Self {
            store,
            cache,
            config,
            keys,
        })
    }

    /// Create a coordinator with the default configuration.
    pub fn with_defaults(store: Arc<S>, cache: Arc<C>) -> Self {
        let config = CatalogConfig::default();
        Self {
            store,
            cache,
            keys: KeySpace::from_config(&config),
            config,
        }
    }

    /// Cache key layout in use.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    // ========================================================================
    // WRITE PATHS
    // ========================================================================

    /// Insert a record, then mirror it into the cache and the index set.
    ///
    /// The cache entry write and the index update run concurrently; either
    /// may fail without affecting the other or the result.
    #[tracing::instrument(skip_all, fields(name = %draft.name))]
    pub async fn create(&self, draft: RecordDraft) -> CatalogResult<Record> {
        let record = self.store.insert(&draft).await?;

        let index_key = self.keys.index_key();
        let member = [record.id.to_string()];
        tokio::join!(
            self.write_entry(&record),
            self.best_effort("index_add", index_key, async {
                self.cache.add_to_set(index_key, &member).await?;
                self.cache.expire(index_key, self.config.record_ttl).await
            }),
        );

        tracing::debug!(record_id = %record.id, "record created");
        Ok(record)
    }

    /// Apply a partial update, then invalidate and repopulate the cache entry.
    ///
    /// The index set is left alone. Returns a confirmation rather than the
    /// record; callers that need it read it back.
    #[tracing::instrument(skip_all, fields(record_id = %id))]
    pub async fn update(&self, id: RecordId, patch: RecordPatch) -> CatalogResult<Confirmation> {
        let affected = self.store.update_by_id(id, &patch).await?;
        if affected == 0 {
            return Err(CatalogError::record_not_found(id));
        }

        let key = self.keys.record_key(id);
        self.best_effort("invalidate", &key, self.cache.delete(&key))
            .await;

        // The write is committed; a failed re-read only leaves the entry empty.
        match self.store.find_by_id(id).await {
            Ok(Some(record)) => self.write_entry(&record).await,
            Ok(None) => tracing::debug!("record deleted before repopulation"),
            Err(e) => tracing::warn!(error = %e, "re-read after update failed, cache entry left empty"),
        }

        Ok(Confirmation::Updated(id))
    }

    /// Delete a record, then drop its cache entry and index membership.
    ///
    /// The index set's TTL restarts, as it does on create.
    #[tracing::instrument(skip_all, fields(record_id = %id))]
    pub async fn delete(&self, id: RecordId) -> CatalogResult<Confirmation> {
        let affected = self.store.delete_by_id(id).await?;
        if affected == 0 {
            return Err(CatalogError::record_not_found(id));
        }

        let key = self.keys.record_key(id);
        let index_key = self.keys.index_key();
        let member = id.to_string();
        tokio::join!(
            self.best_effort("invalidate", &key, self.cache.delete(&key)),
            self.best_effort("index_remove", index_key, async {
                self.cache.remove_from_set(index_key, &member).await?;
                self.cache.expire(index_key, self.config.record_ttl).await
            }),
        );

        Ok(Confirmation::Deleted(id))
    }

    // ========================================================================
    // READ-THROUGH PATHS
    // ========================================================================

    /// Get a record, falling back to the durable store on a cache miss.
    ///
    /// A miss that resolves leaves the entry warm for the next reader.
    #[tracing::instrument(skip_all, fields(record_id = %id))]
    pub async fn get(&self, id: RecordId) -> CatalogResult<Record> {
        if let Some(record) = self.cached_record(id).await {
            tracing::debug!("cache hit");
            return Ok(record);
        }

        tracing::debug!("cache miss, reading through");
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::record_not_found(id))?;

        self.write_entry(&record).await;
        Ok(record)
    }

    /// List every record.
    ///
    /// With a populated index set, each member is resolved from the cache or,
    /// on a miss, from the store (repairing the entry). Members the store no
    /// longer knows are dropped from the result and pruned from the index.
    /// Members whose store lookup fails are dropped from the result only.
    ///
    /// With an empty or unreadable index set, or one whose every member was
    /// just pruned, the index is rebuilt from the store. Fails with
    /// `NotFound` when the store is empty too.
    ///
    /// Order is unspecified.
    #[tracing::instrument(skip_all)]
    pub async fn list(&self) -> CatalogResult<Vec<Record>> {
        let members = match self.cache.set_members(self.keys.index_key()).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(error = %e, "index set unreadable, rebuilding from store");
                Vec::new()
            }
        };

        if members.is_empty() {
            return self.rebuild_index().await;
        }

        let resolved = join_all(members.iter().map(|member| self.resolve_member(member))).await;
        if resolved.iter().all(|r| matches!(r, Resolved::Pruned)) {
            tracing::debug!(members = members.len(), "every index member was stale");
            return self.rebuild_index().await;
        }

        let records: Vec<Record> = resolved
            .into_iter()
            .filter_map(|r| match r {
                Resolved::Found(record) => Some(record),
                Resolved::Pruned | Resolved::Dropped => None,
            })
            .collect();

        tracing::debug!(
            members = members.len(),
            returned = records.len(),
            "list assembled from index set"
        );
        Ok(records)
    }

    // ========================================================================
    // CACHE-ONLY PROJECTIONS
    // ========================================================================

    /// Get a record from the cache only. No fallback, no repair.
    #[tracing::instrument(skip_all, fields(record_id = %id))]
    pub async fn cached_get(&self, id: RecordId) -> CatalogResult<Record> {
        self.peek(id)
            .await?
            .ok_or_else(|| CatalogError::record_not_found(id))
    }

    /// List records from the cache only. No fallback, no repair.
    ///
    /// Fails with `NotFound` when the index set is empty. Members without a
    /// cache entry are skipped.
    #[tracing::instrument(skip_all)]
    pub async fn cached_list(&self) -> CatalogResult<Vec<Record>> {
        let members = self.cache.set_members(self.keys.index_key()).await?;
        if members.is_empty() {
            return Err(CatalogError::catalog_empty());
        }

        let peeked = join_all(members.iter().map(|member| self.peek_member(member))).await;
        let mut records = Vec::with_capacity(peeked.len());
        for record in peeked {
            if let Some(record) = record? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    /// Rebuild the index set (and every entry) from the durable store.
    async fn rebuild_index(&self) -> CatalogResult<Vec<Record>> {
        let records = self.store.find_all().await?;
        if records.is_empty() {
            tracing::debug!("durable store is empty");
            return Err(CatalogError::catalog_empty());
        }

        let index_key = self.keys.index_key();
        let ids: Vec<String> = records.iter().map(|r| r.id.to_string()).collect();
        tokio::join!(
            self.best_effort("index_rebuild", index_key, async {
                self.cache.add_to_set(index_key, &ids).await?;
                self.cache.expire(index_key, self.config.record_ttl).await
            }),
            join_all(records.iter().map(|record| self.write_entry(record))),
        );

        tracing::info!(count = records.len(), "index set rebuilt from durable store");
        Ok(records)
    }

    /// Resolve one index member on the read-through list path.
    async fn resolve_member(&self, member: &str) -> Resolved {
        let id: RecordId = match member.parse() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(member, "malformed index member, pruning");
                self.prune_member(member).await;
                return Resolved::Pruned;
            }
        };

        if let Some(record) = self.cached_record(id).await {
            return Resolved::Found(record);
        }

        match self.store.find_by_id(id).await {
            Ok(Some(record)) => {
                self.write_entry(&record).await;
                Resolved::Found(record)
            }
            Ok(None) => {
                tracing::debug!(record_id = %id, "index member gone from store, pruning");
                self.prune_member(member).await;
                Resolved::Pruned
            }
            Err(e) => {
                tracing::warn!(record_id = %id, error = %e, "store lookup failed, dropping member");
                Resolved::Dropped
            }
        }
    }

    async fn prune_member(&self, member: &str) {
        let index_key = self.keys.index_key();
        self.best_effort(
            "index_remove",
            index_key,
            self.cache.remove_from_set(index_key, member),
        )
        .await;
    }

    /// Cache lookup for read-through paths. Errors and corrupt entries are misses.
    async fn cached_record(&self, id: RecordId) -> Option<Record> {
        let key = self.keys.record_key(id);
        let bytes = match self.cache.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match decode_record(&key, &bytes) {
            Ok(record) if record.id == id => Some(record),
            Ok(record) => {
                tracing::warn!(key = %key, found = %record.id, "cache entry holds another record, treating as miss");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Cache lookup for cache-only projections. Errors propagate.
    async fn peek(&self, id: RecordId) -> CatalogResult<Option<Record>> {
        let key = self.keys.record_key(id);
        match self.cache.get(&key).await? {
            Some(bytes) => Ok(Some(decode_record(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    async fn peek_member(&self, member: &str) -> CatalogResult<Option<Record>> {
        match member.parse::<RecordId>() {
            Ok(id) => self.peek(id).await,
            Err(_) => Ok(None),
        }
    }

    /// Write a fresh snapshot of `record` with a full TTL.
    async fn write_entry(&self, record: &Record) {
        let key = self.keys.record_key(record.id);
        let result = match encode_record(&key, record) {
            Ok(bytes) => self.cache.set(&key, &bytes, self.config.record_ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "cache entry write failed");
        }
    }

    /// Run a cache mutation whose failure must not reach the caller.
    async fn best_effort<F>(&self, op: &'static str, key: &str, fut: F)
    where
        F: Future<Output = CatalogResult<()>>,
    {
        if let Err(e) = fut.await {
            tracing::warn!(op, key, error = %e, "best-effort cache operation failed");
        }
    }
}

impl<S, C> Clone for CatalogCoordinator<S, C>
where
    S: DurableStore,
    C: CacheStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            keys: self.keys.clone(),
        }
    }
}
