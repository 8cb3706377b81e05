//! # Cache Store
//!
//! Key-value cache behind a trait so handlers never touch a concrete
//! backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Arc<dyn CacheStore>                                                    │
//! │     │                                                                   │
//! │     ├── MemoryCache   tests, single-node deployments, Redis fallback   │
//! │     └── RedisCache    shared cache across API instances                 │
//! │                                                                         │
//! │  Keys in use:                                                           │
//! │     orders:branch:{id}        cached order list (get / set / delete)   │
//! │     orders:company:{id}       evicted on order mutation                 │
//! │     orders:waiter:{id}        evicted on order mutation                 │
//! │     order-seq:{branch}:{day}  order number counter (increment)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{RelayError, RelayResult};

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> RelayResult<Option<String>>;

    /// Stores `value`; `ttl` of `None` keeps it until deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RelayResult<()>;

    /// Removes the given keys and returns how many existed.
    async fn delete(&self, keys: &[String]) -> RelayResult<u64>;

    /// Atomically adds one and returns the new value. A missing key starts
    /// at zero and gets `ttl` applied when it is created.
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> RelayResult<i64>;
}

// =============================================================================
// In-Memory Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        CacheEntry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Writes sweep expired entries out of a [`MemoryCache`] at most this often.
const PRUNE_INTERVAL: Duration = Duration::from_secs(30);

/// Process-local cache.
///
/// Reads drop the expired entry they hit. `set` and `increment` also sweep
/// every expired entry, at most once per [`PRUNE_INTERVAL`], so keys that
/// are never read again (yesterday's order counters) do not pile up.
#[derive(Debug, Default)]
pub struct MemoryCache {
    store: RwLock<MemoryStore>,
}

#[derive(Debug, Default)]
struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
    next_prune: Option<Instant>,
}

impl MemoryStore {
    fn prune_expired(&mut self) {
        let now = Instant::now();
        if self.next_prune.is_some_and(|at| now < at) {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        self.next_prune = Some(now + PRUNE_INTERVAL);

        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, remaining = self.entries.len(), "Pruned expired cache entries");
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry exists under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.store
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Entries held, counting expired ones not yet pruned.
    pub async fn stored_len(&self) -> usize {
        self.store.read().await.entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> RelayResult<Option<String>> {
        let mut store = self.store.write().await;
        match store.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                store.entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RelayResult<()> {
        let mut store = self.store.write().await;
        store.prune_expired();
        store
            .entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RelayResult<u64> {
        let mut store = self.store.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| store.entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn increment(&self, key: &str, ttl: Option<Duration>) -> RelayResult<i64> {
        let mut store = self.store.write().await;
        store.prune_expired();

        let current = match store.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry),
            _ => None,
        };

        let (next, expires_at) = match current {
            Some(entry) => {
                let value = entry.value.parse::<i64>().map_err(|_| {
                    RelayError::Cache(format!("value at {key} is not an integer"))
                })?;
                (value + 1, entry.expires_at)
            }
            None => (1, ttl.map(|d| Instant::now() + d)),
        };

        store.entries.insert(
            key.to_string(),
            CacheEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

// =============================================================================
// Redis Cache
// =============================================================================

/// Cache backed by a Redis server through one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisCache {
    /// Opens the client and establishes the shared connection.
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!("Redis cache connection established");
        Ok(RedisCache { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> RelayResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RelayResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let removed: u64 = cmd.query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn increment(&self, key: &str, ttl: Option<Duration>) -> RelayResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;

        if value == 1 {
            if let Some(ttl) = ttl {
                let _: () = redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(ttl.as_millis() as u64)
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(value)
    }
}
