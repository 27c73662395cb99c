//! Cache backend trait.
//!
//! The coordinator only needs plain key/value operations with a TTL plus a
//! handful of set operations for the index key. Implementations follow Redis
//! semantics for anything the operations below leave open.

use async_trait::async_trait;
use catalog_core::CatalogResult;
use std::time::Duration;

/// Cache backend trait for pluggable cache implementations.
///
/// # Semantics
///
/// - `set` replaces both the value and the TTL of a key.
/// - `add_to_set` creates the set without a TTL if it does not exist and
///   leaves an existing TTL untouched.
/// - Removing the last member of a set removes the key.
/// - `set_members` on a missing key yields an empty list.
/// - `expire` on a missing key is a no-op.
///
/// Failures are reported as `CatalogError::Cache`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw bytes stored at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>>;

    /// Store `value` at `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CatalogResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> CatalogResult<()>;

    /// Add `members` to the set at `key`.
    async fn add_to_set(&self, key: &str, members: &[String]) -> CatalogResult<()>;

    /// Remove `member` from the set at `key`.
    async fn remove_from_set(&self, key: &str, member: &str) -> CatalogResult<()>;

    /// List the members of the set at `key`. Order is unspecified.
    async fn set_members(&self, key: &str) -> CatalogResult<Vec<String>>;

    /// Reset the TTL of `key`.
    async fn expire(&self, key: &str, ttl: Duration) -> CatalogResult<()>;
}

/// Whole seconds for backends that only accept second granularity.
///
/// Rounds up so a sub-second TTL never becomes "no expiry".
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}
