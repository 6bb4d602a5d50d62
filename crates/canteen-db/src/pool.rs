//! # Ledger Store Connection
//!
//! One SQLite pool shared by every service. Ordering operations each take a
//! single pooled connection and run `BEGIN … COMMIT` on it.
//!
//! ## Request To Connection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  canteen-api                                                            │
//! │    place order ─────┐                                                   │
//! │    cancel order ────┼──► Database::begin() ──► write tx (one at a time) │
//! │    update order ────┘                                                   │
//! │                                                                         │
//! │    order history ───┐                                                   │
//! │    quota lookup ────┼──► pool().acquire() ───► WAL reader (concurrent)  │
//! │    auth user row ───┘                                                   │
//! │                                                                         │
//! │  Writer blocked longer than busy_timeout ──► DbError::Busy ──► 409      │
//! │  No free connection within acquire_timeout ─► PoolExhausted ──► 503     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `sqlite::memory:` gives every connection its own empty database, so the
//! in-memory configuration pins the pool to one connection that never
//! expires.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

const IN_MEMORY_URL: &str = "sqlite::memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `sqlite://path`, `sqlite::memory:` or a bare file path.
    pub database_url: String,
    pub max_connections: u32,
    /// Wait for a free pooled connection.
    pub acquire_timeout: Duration,
    /// Wait for the SQLite write lock.
    pub busy_timeout: Duration,
    /// `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    pub migrate: bool,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        DbConfig {
            database_url: database_url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            migrate: true,
        }
    }

    /// Migrated private database for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(IN_MEMORY_URL)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }

    /// Bare paths become `sqlite://<path>`.
    fn connect_url(&self) -> String {
        if self.database_url.starts_with("sqlite:") {
            self.database_url.clone()
        } else {
            format!("sqlite://{}", self.database_url)
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared pool handle. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the database and applies migrations.
    ///
    /// File databases use WAL with `synchronous = NORMAL`; every connection
    /// enforces foreign keys.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(url = %config.database_url, "Opening ledger store");

        let mut options = SqliteConnectOptions::from_str(&config.connect_url())
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);
        if !config.is_in_memory() {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.migrate {
            migrations::run_migrations(&db.pool).await?;
        }

        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a write transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        info!("Closing ledger store");
        self.pool.close().await;
    }

    /// `SELECT 1` succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
