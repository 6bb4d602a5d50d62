//! # Quota Repository
//!
//! One `user_free_quotas` row per (user, business day), created lazily.
//!
//! ## Compare-and-set
//! The caller reads `quantity_used`, lets the allocator decide how many free
//! units to grant, and writes back only if the value it read is still there:
//!
//! ```text
//! read   used = 3                     (or no row → 0)
//! write  INSERT ... ON CONFLICT(user_id, consumption_date)
//!        DO UPDATE SET quantity_used = 3 + granted
//!        WHERE quantity_used = 3      ← 0 rows → concurrent order, abort
//! ```

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the daily free quota.
pub struct QuotaRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> QuotaRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        QuotaRepository { conn }
    }

    /// Units used on `day`, zero when no row exists yet.
    pub async fn used(&mut self, user_id: i64, day: NaiveDate) -> DbResult<i64> {
        let used: Option<i64> = sqlx::query_scalar(
            "SELECT quantity_used FROM user_free_quotas WHERE user_id = ? AND consumption_date = ?",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(used.unwrap_or(0))
    }

    /// Adds `granted` units to the day's row if it still reads `expected_used`.
    ///
    /// Returns `false` when another transaction changed the row first.
    pub async fn consume(&mut self, user_id: i64, day: NaiveDate, expected_used: i64, granted: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_free_quotas (user_id, consumption_date, quantity_used)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id, consumption_date)
            DO UPDATE SET quantity_used = excluded.quantity_used
            WHERE user_free_quotas.quantity_used = ?
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(expected_used + granted)
        .bind(expected_used)
        .execute(&mut *self.conn)
        .await?;

        debug!(user_id, %day, expected_used, granted, applied = result.rows_affected() == 1, "Quota consume");
        Ok(result.rows_affected() == 1)
    }

    /// Gives back `qty` units, only if at least that many were used.
    ///
    /// Returns `false` (and changes nothing) when the row is missing or
    /// holds fewer than `qty`.
    pub async fn restore(&mut self, user_id: i64, day: NaiveDate, qty: i64) -> DbResult<bool> {
        if qty <= 0 {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE user_free_quotas
            SET quantity_used = quantity_used - ?
            WHERE user_id = ? AND consumption_date = ? AND quantity_used >= ?
            "#,
        )
        .bind(qty)
        .bind(user_id)
        .bind(day)
        .bind(qty)
        .execute(&mut *self.conn)
        .await?;

        debug!(user_id, %day, qty, applied = result.rows_affected() == 1, "Quota restore");
        Ok(result.rows_affected() == 1)
    }
}
