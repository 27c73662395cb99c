//! CATALOG Storage - Durable Store, Cache, and Cache-Aside Coordination
//!
//! This crate provides:
//!
//! - [`DurableStore`]: async trait over the source of truth, with an
//!   in-memory implementation and a PostgreSQL one (`postgres` feature)
//! - [`CacheStore`]: async trait over a TTL key-value cache with set
//!   support, with an in-memory implementation and a Redis one (`redis`
//!   feature)
//! - [`CatalogCoordinator`]: the cache-aside protocol tying both together
//! - [`init_tracing`]: subscriber setup for binaries and test harnesses

pub mod cache;
pub mod coordinator;
pub mod store;
pub mod telemetry;

pub use cache::{ttl_secs, CacheStore, InMemoryCache, KeySpace};
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisCacheConfig};
pub use coordinator::CatalogCoordinator;
pub use store::{DurableStore, InMemoryStore};
#[cfg(feature = "postgres")]
pub use store::{PgStore, PgStoreConfig};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
