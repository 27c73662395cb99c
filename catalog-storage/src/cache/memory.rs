//! In-process cache backend with Redis-like TTL semantics.
//!
//! Expiry is measured on the tokio clock, so tests running under a paused
//! runtime can advance time past a TTL deterministically. Expired entries are
//! invisible to reads and purged lazily on the next write to the same key.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{CacheError, CatalogError, CatalogResult};
use tokio::time::Instant;

use super::traits::CacheStore;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Members(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory cache for tests and single-process deployments.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryCache {
    /// Create an empty, available cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the cache service going away (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live value exists at `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.get(key).is_some_and(|e| e.is_live(now)))
            .unwrap_or(false)
    }

    /// Remaining lifetime of `key`; `None` when missing or persistent.
    pub fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Drop every key, as if the cache had been flushed or restarted.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn check_available(&self) -> CatalogResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CatalogError::cache_unavailable("in-memory cache marked unavailable"))
        }
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, HashMap<String, Entry>>> {
        self.check_available()?;
        self.entries
            .read()
            .map_err(|_| CatalogError::Cache(CacheError::LockPoisoned))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, HashMap<String, Entry>>> {
        self.check_available()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CatalogError::Cache(CacheError::LockPoisoned))?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries)
    }
}

fn wrong_type(key: &str) -> CatalogError {
    CatalogError::Cache(CacheError::WrongType {
        key: key.to_string(),
    })
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        let entries = self.read()?;
        let now = Instant::now();
        match entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(None),
            Some(Entry {
                value: Value::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CatalogResult<()> {
        let mut entries = self.write()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value.to_vec()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        let mut entries = self.write()?;
        entries.remove(key);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, members: &[String]) -> CatalogResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut entries = self.write()?;
        match entries.get_mut(key) {
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Members(members.iter().cloned().collect()),
                        expires_at: None,
                    },
                );
                Ok(())
            }
            Some(Entry {
                value: Value::Members(set),
                ..
            }) => {
                set.extend(members.iter().cloned());
                Ok(())
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> CatalogResult<()> {
        let mut entries = self.write()?;
        let now_empty = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Entry {
                value: Value::Members(set),
                ..
            }) => {
                set.remove(member);
                set.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CatalogResult<Vec<String>> {
        let entries = self.read()?;
        let now = Instant::now();
        match entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Members(set),
                ..
            }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CatalogResult<()> {
        let mut entries = self.write()?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}
