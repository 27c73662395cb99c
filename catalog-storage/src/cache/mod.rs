//! Cache abstraction and backends.
//!
//! The cache holds two kinds of keys:
//!
//! - `<prefix>:<id>`: a serialized record snapshot with a TTL
//! - `<prefix>:ids`: an unordered set of record identifiers (the index set)
//!
//! Nothing in the cache is authoritative. Any key may vanish at any time.

pub mod keys;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_backend;
pub mod traits;

pub use keys::KeySpace;
pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use redis_backend::{RedisCache, RedisCacheConfig};
pub use traits::{ttl_secs, CacheStore};
