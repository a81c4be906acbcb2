//! Volatile tier: fast, evictable key/value storage in front of the durable
//! tier.
//!
//! No TTL is ever set from here. Entries live until the backing service
//! evicts them or a later write overwrites them.

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use moka::future::Cache;

use super::CacheKey;
use crate::{FinmemoError, Result};

/// Default capacity of the in-process volatile tier.
pub const DEFAULT_MEMORY_MAX_ENTRIES: u64 = 10_000;

/// Fast key/value tier.
///
/// `get` distinguishes a genuine miss (`Ok(None)`) from an unreachable
/// backend (`Err(StoreUnavailable)`).
#[async_trait]
pub trait VolatileStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Insert or overwrite the payload for `key`.
    async fn set(&self, key: &CacheKey, value: &str) -> Result<()>;
}

// ============================================================================
// Redis
// ============================================================================

/// Redis-backed volatile tier using a deadpool connection pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build a pool for `url` (e.g. `redis://localhost:6379/0`).
    ///
    /// Connections are opened lazily; an unreachable server surfaces on
    /// the first `get`/`set`, not here.
    pub fn connect(url: &str, max_size: usize) -> Result<Self> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(max_size));
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| FinmemoError::Configuration(format!("invalid redis settings: {e}")))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Round-trip a `PING` to verify the server is reachable.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|e| FinmemoError::unavailable("volatile", e))
    }

    /// Close the pool. Pending and future checkouts fail.
    pub fn close(&self) {
        self.pool.close();
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| FinmemoError::unavailable("volatile", e))
    }
}

#[async_trait]
impl VolatileStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key.as_str())
            .await
            .map_err(|e| FinmemoError::unavailable("volatile", e))
    }

    async fn set(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key.as_str(), value)
            .await
            .map_err(|e| FinmemoError::unavailable("volatile", e))
    }
}

// ============================================================================
// In-process
// ============================================================================

/// In-process volatile tier backed by a bounded moka cache.
///
/// Size-bounded only; entries are evicted under capacity pressure, never
/// by age.
pub struct MemoryStore {
    entries: Cache<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MEMORY_MAX_ENTRIES)
    }

    pub fn with_max_entries(max: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max).build(),
        }
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolatileStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        Ok(self.entries.get(key.as_str()).await)
    }

    async fn set(&self, key: &CacheKey, value: &str) -> Result<()> {
        self.entries
            .insert(key.as_str().to_owned(), value.to_owned())
            .await;
        Ok(())
    }
}
