//! # Schema Migrations
//!
//! The ledger schema lives in `migrations/sqlite/` at the workspace root and
//! is compiled into the binary, so a fresh database file is usable as soon
//! as [`Database::new`](crate::Database::new) returns.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   users, outlets, products, inventory,
//!                              stock_history, wallets, coupons, orders,
//!                              order_items, user_free_quotas, feedback, ...
//! ```
//!
//! Applied files are checksummed in `_sqlx_migrations`; change the schema by
//! adding `NNN_<what>.sql`, never by editing an applied file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    // `_sqlx_migrations` does not exist before the first run.
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}
