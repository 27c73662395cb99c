//! Redis cache backend.
//!
//! Uses a multiplexed [`ConnectionManager`], which reconnects on its own after
//! the server drops. Each call clones the manager handle; clones share the
//! underlying connection.

use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{CatalogError, CatalogResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::traits::{ttl_secs, CacheStore};

/// Redis connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisCacheConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl RedisCacheConfig {
    /// Load from `CATALOG_REDIS_URL`, falling back to localhost.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("CATALOG_REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        }
    }
}

fn unavailable(e: redis::RedisError) -> CatalogError {
    CatalogError::cache_unavailable(e.to_string())
}

/// Cache backed by a Redis server.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a connection manager for `config.url`.
    pub async fn connect(config: &RedisCacheConfig) -> CatalogResult<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!(url = %config.url, "Connected to Redis cache");
        Ok(Self::new(conn))
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        let mut conn = self.conn();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(unavailable)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CatalogResult<()> {
        let mut conn = self.conn();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        let mut conn = self.conn();
        conn.del::<_, ()>(key).await.map_err(unavailable)
    }

    async fn add_to_set(&self, key: &str, members: &[String]) -> CatalogResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        conn.sadd::<_, _, ()>(key, members)
            .await
            .map_err(unavailable)
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> CatalogResult<()> {
        let mut conn = self.conn();
        conn.srem::<_, _, ()>(key, member)
            .await
            .map_err(unavailable)
    }

    async fn set_members(&self, key: &str) -> CatalogResult<Vec<String>> {
        let mut conn = self.conn();
        conn.smembers::<_, Vec<String>>(key)
            .await
            .map_err(unavailable)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CatalogResult<()> {
        let secs = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);
        let mut conn = self.conn();
        conn.expire::<_, ()>(key, secs)
            .await
            .map_err(unavailable)
    }
}
