//! PostgreSQL durable store.
//!
//! Connection pooling uses deadpool-postgres. Records live in a single
//! `catalog_record` table; [`PgStore::ensure_schema`] creates it when missing.

use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{
    CatalogError, CatalogResult, ConfigError, Record, RecordDraft, RecordId, RecordPatch,
    StoreError,
};
use chrono::{DateTime, Utc};
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use super::DurableStore;

/// DDL for the record table.
pub const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS catalog_record (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    price BIGINT NOT NULL CHECK (price >= 0),
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    image TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const INSERT_SQL: &str = "INSERT INTO catalog_record
    (id, name, price, description, category, image, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, now(), now())
    RETURNING id, name, price, description, category, image, created_at, updated_at";

const SELECT_ONE_SQL: &str = "SELECT id, name, price, description, category, image, created_at, updated_at
    FROM catalog_record WHERE id = $1";

const SELECT_ALL_SQL: &str = "SELECT id, name, price, description, category, image, created_at, updated_at
    FROM catalog_record";

const DELETE_SQL: &str = "DELETE FROM catalog_record WHERE id = $1";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Connection settings for [`PgStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgStoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Upper bound on pooled connections; must be positive.
    pub max_size: usize,
    /// Applied to pool waits, connection setup and recycling alike.
    pub timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "catalog".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: var.to_string(),
        value: raw.to_string(),
        reason: "not a valid number".to_string(),
    })
}

impl PgStoreConfig {
    /// Load from `CATALOG_DB_{HOST,PORT,NAME,USER,PASSWORD,POOL_SIZE,TIMEOUT}`.
    ///
    /// Unset variables keep their defaults. Unparseable numbers are rejected
    /// rather than silently defaulted.
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("CATALOG_DB_HOST") {
            config.host = host;
        }
        if let Some(raw) = lookup("CATALOG_DB_PORT") {
            config.port = parse_var("CATALOG_DB_PORT", &raw)?;
        }
        if let Some(dbname) = lookup("CATALOG_DB_NAME") {
            config.dbname = dbname;
        }
        if let Some(user) = lookup("CATALOG_DB_USER") {
            config.user = user;
        }
        if let Some(password) = lookup("CATALOG_DB_PASSWORD") {
            config.password = password;
        }
        if let Some(raw) = lookup("CATALOG_DB_POOL_SIZE") {
            config.max_size = parse_var("CATALOG_DB_POOL_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("CATALOG_DB_TIMEOUT") {
            config.timeout = Duration::from_secs(parse_var("CATALOG_DB_TIMEOUT", &raw)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            }
            .into());
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_size".to_string(),
                value: "0".to_string(),
                reason: "the pool needs at least one connection".to_string(),
            }
            .into());
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                value: "0".to_string(),
                reason: "every pool operation would time out immediately".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Build a lazily-connecting pool. Fails only on invalid settings.
    pub fn create_pool(&self) -> CatalogResult<Pool> {
        self.validate()?;

        let mut pool = PoolConfig::new(self.max_size);
        pool.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(pool);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| CatalogError::store_unavailable(format!("pool setup: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn unavailable(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::store_unavailable(e.to_string())
}

/// Server-side rejections are write failures; anything else is transport.
fn write_error(e: tokio_postgres::Error) -> CatalogError {
    if e.as_db_error().is_some() {
        StoreError::WriteFailed {
            reason: e.to_string(),
        }
        .into()
    } else {
        unavailable(e)
    }
}

fn decode_error(e: impl std::fmt::Display) -> CatalogError {
    StoreError::Decode {
        reason: e.to_string(),
    }
    .into()
}

fn to_db_price(price: u64) -> CatalogResult<i64> {
    i64::try_from(price).map_err(|_| {
        StoreError::WriteFailed {
            reason: format!("price {} exceeds BIGINT range", price),
        }
        .into()
    })
}

fn row_to_record(row: &Row) -> CatalogResult<Record> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let price: i64 = row.try_get("price").map_err(decode_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode_error)?;

    Ok(Record {
        id: RecordId::new(id),
        name: row.try_get("name").map_err(decode_error)?,
        price: u64::try_from(price)
            .map_err(|_| decode_error(format!("negative price {} for {}", price, id)))?,
        description: row.try_get("description").map_err(decode_error)?,
        category: row.try_get("category").map_err(decode_error)?,
        image: row.try_get("image").map_err(decode_error)?,
        created_at,
        updated_at,
    })
}

// ============================================================================
// STORE
// ============================================================================

/// Durable store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &PgStoreConfig) -> CatalogResult<Self> {
        config.create_pool().map(Self::new)
    }

    /// Create the record table if it does not exist yet.
    pub async fn ensure_schema(&self) -> CatalogResult<()> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA_SQL).await.map_err(write_error)?;
        tracing::info!("catalog_record schema ensured");
        Ok(())
    }

    /// Check out a pooled client; pool exhaustion or a dead server is `Unavailable`.
    async fn client(&self) -> CatalogResult<Object> {
        self.pool.get().await.map_err(unavailable)
    }
}

#[async_trait]
impl DurableStore for PgStore {
    async fn insert(&self, draft: &RecordDraft) -> CatalogResult<Record> {
        let client = self.client().await?;
        let id = RecordId::generate().as_uuid();
        let price = to_db_price(draft.price)?;

        let row = client
            .query_one(
                INSERT_SQL,
                &[
                    &id,
                    &draft.name,
                    &price,
                    &draft.description,
                    &draft.category,
                    &draft.image,
                ],
            )
            .await
            .map_err(write_error)?;

        row_to_record(&row)
    }

    async fn find_by_id(&self, id: RecordId) -> CatalogResult<Option<Record>> {
        let client = self.client().await?;
        let uuid = id.as_uuid();
        let row = client
            .query_opt(SELECT_ONE_SQL, &[&uuid])
            .await
            .map_err(unavailable)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_all(&self) -> CatalogResult<Vec<Record>> {
        let client = self.client().await?;
        let rows = client
            .query(SELECT_ALL_SQL, &[])
            .await
            .map_err(unavailable)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn update_by_id(&self, id: RecordId, patch: &RecordPatch) -> CatalogResult<u64> {
        let uuid = id.as_uuid();
        let price = patch.price.map(to_db_price).transpose()?;

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(name) = &patch.name {
            params.push(name);
            assignments.push(format!("name = ${}", params.len()));
        }
        if let Some(price) = &price {
            params.push(price);
            assignments.push(format!("price = ${}", params.len()));
        }
        if let Some(description) = &patch.description {
            params.push(description);
            assignments.push(format!("description = ${}", params.len()));
        }
        if let Some(category) = &patch.category {
            params.push(category);
            assignments.push(format!("category = ${}", params.len()));
        }
        if let Some(image) = &patch.image {
            params.push(image);
            assignments.push(format!("image = ${}", params.len()));
        }
        assignments.push("updated_at = now()".to_string());
        params.push(&uuid);

        let sql = format!(
            "UPDATE catalog_record SET {} WHERE id = ${}",
            assignments.join(", "),
            params.len()
        );

        let client = self.client().await?;
        client
            .execute(sql.as_str(), &params)
            .await
            .map_err(write_error)
    }

    async fn delete_by_id(&self, id: RecordId) -> CatalogResult<u64> {
        let client = self.client().await?;
        let uuid = id.as_uuid();
        client
            .execute(DELETE_SQL, &[&uuid])
            .await
            .map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = PgStoreConfig::from_lookup(lookup(&[
            ("CATALOG_DB_HOST", "db.internal"),
            ("CATALOG_DB_PORT", "6543"),
            ("CATALOG_DB_POOL_SIZE", "4"),
        ]))
        .unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.max_size, 4);
        assert_eq!(config.dbname, "catalog");
    }

    #[test]
    fn test_unparseable_port_is_rejected() {
        let err = PgStoreConfig::from_lookup(lookup(&[("CATALOG_DB_PORT", "fifty")])).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "CATALOG_DB_PORT"
        ));
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(PgStoreConfig::from_lookup(lookup(&[("CATALOG_DB_POOL_SIZE", "0")])).is_err());

        let config = PgStoreConfig {
            max_size: 0,
            ..PgStoreConfig::default()
        };
        assert!(matches!(
            config.create_pool(),
            Err(CatalogError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = PgStoreConfig {
            timeout: Duration::ZERO,
            ..PgStoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_creation_is_lazy() {
        let store = PgStore::from_config(&PgStoreConfig::default()).unwrap();
        assert_eq!(store.pool.status().size, 0);
    }

    #[test]
    fn test_price_outside_bigint_is_rejected() {
        assert_eq!(to_db_price(42).unwrap(), 42);
        let err = to_db_price(u64::MAX).unwrap_err();
        assert!(matches!(err, CatalogError::Store(StoreError::WriteFailed { .. })));
    }
}
