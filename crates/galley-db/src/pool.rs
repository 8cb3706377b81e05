//! # Database Pool Management
//!
//! Connection pool creation and write serialization for SQLite.
//!
//! ## Write Serialization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler A (order 1 → PAID)           Handler B (order 2 → PAID)        │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  begin_write: BEGIN IMMEDIATE          begin_write: BEGIN IMMEDIATE     │
//! │       │ takes the write lock                │ lock held by A            │
//! │       │                                     │ waits up to busy_timeout  │
//! │  status CAS, lines, deduction               │                           │
//! │  COMMIT ─────────── releases ──────────────►│ takes the write lock      │
//! │                                        status CAS, lines, deduction     │
//! │                                        COMMIT                           │
//! │                                                                         │
//! │  Readers (get_detail, list_for_branch) use the pool directly and        │
//! │  read the last committed WAL snapshot without waiting.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A deferred `BEGIN` would take the write lock only at the first write,
//! and SQLite fails such an upgrade with `SQLITE_BUSY` straight away when
//! another writer got there first. Every write transaction therefore goes
//! through [`begin_write`]. A writer that still cannot get the lock within
//! `busy_timeout` surfaces as [`DbError::Busy`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::ingredient::IngredientRepository;
use crate::repository::line::LineRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::recipe::RecipeRepository;
use crate::repository::stock::StockRepository;

/// Opens a transaction that holds the database write lock from its first
/// statement.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings. The API builds one from `ApiConfig::db_config`.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/galley.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub database_path: PathBuf,

    /// Pool size. Readers use any of them; writers take turns on the lock.
    /// Default: 5
    pub max_connections: u32,

    /// How long a request waits for a free pooled connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// How long a writer waits for another writer's transaction to finish.
    /// Default: 5 seconds
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// Defaults for a file-backed database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets how long a request waits for a pooled connection.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets how long a writer waits on the write lock.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// A private in-memory database for tests. Each connection to
    /// `:memory:` would see its own empty database, so the pool holds one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared pool plus repository accessors. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and applies pending migrations.
    ///
    /// Every connection runs in WAL mode with NORMAL synchronous, foreign
    /// keys on and the configured `busy_timeout`.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Database pool ready"
        );

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    /// Raw pool, for fixtures and diagnostics such as `migration_status`.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Orders and the order-update transaction.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn lines(&self) -> LineRepository {
        LineRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    pub fn ingredients(&self) -> IngredientRepository {
        IngredientRepository::new(self.pool.clone())
    }

    pub fn recipes(&self) -> RecipeRepository {
        RecipeRepository::new(self.pool.clone())
    }

    /// Returns the stock ledger.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections, then closes the pool. Later
    /// repository calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip; backs `GET /health`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
