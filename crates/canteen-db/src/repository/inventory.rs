//! # Inventory Repository
//!
//! Stock levels per (product, outlet) and the stock history audit log.
//!
//! ## Deduction Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read:   SELECT quantity FROM inventory WHERE product_id = 7   →  3     │
//! │  plan:   3 ≥ 2  ✓                                                        │
//! │  write:  UPDATE inventory SET quantity = quantity - 2                   │
//! │          WHERE product_id = 7 AND outlet_id = 1 AND quantity >= 2       │
//! │                                                                         │
//! │  rows_affected = 0  →  stock moved since the read; abort the order      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use super::placeholders;
use crate::error::DbResult;
use canteen_core::{Inventory, StockAction, StockHistory};

/// Repository for inventory rows and stock history.
pub struct InventoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> InventoryRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        InventoryRepository { conn }
    }

    /// Inventory row for a product at an outlet.
    pub async fn get(&mut self, product_id: i64, outlet_id: i64) -> DbResult<Option<Inventory>> {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT id, product_id, outlet_id, quantity, threshold, updated_at
            FROM inventory
            WHERE product_id = ? AND outlet_id = ?
            "#,
        )
        .bind(product_id)
        .bind(outlet_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(inventory)
    }

    /// Current quantity of every listed product that has an inventory row
    /// at the outlet.
    pub async fn stock_levels(&mut self, outlet_id: i64, product_ids: &[i64]) -> DbResult<HashMap<i64, i64>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT product_id, quantity FROM inventory WHERE outlet_id = ? AND product_id IN ({})",
            placeholders(product_ids.len())
        );
        let mut query = sqlx::query_as::<_, (i64, i64)>(&sql).bind(outlet_id);
        for id in product_ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&mut *self.conn).await?;

        Ok(rows.into_iter().collect())
    }

    /// Creates the inventory row for a product.
    pub async fn insert(&mut self, product_id: i64, outlet_id: i64, quantity: i64, threshold: i64) -> DbResult<Inventory> {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventory (product_id, outlet_id, quantity, threshold, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, product_id, outlet_id, quantity, threshold, updated_at
            "#,
        )
        .bind(product_id)
        .bind(outlet_id)
        .bind(quantity)
        .bind(threshold)
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(inventory)
    }

    /// Decrements stock if at least `quantity` is still on hand.
    ///
    /// Returns `false` when the guard matched no row.
    pub async fn deduct(&mut self, product_id: i64, outlet_id: i64, quantity: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?, updated_at = ?
            WHERE product_id = ? AND outlet_id = ? AND quantity >= ?
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .bind(outlet_id)
        .bind(quantity)
        .execute(&mut *self.conn)
        .await?;

        debug!(product_id, outlet_id, quantity, applied = result.rows_affected() == 1, "Stock deduct");
        Ok(result.rows_affected() == 1)
    }

    /// Puts stock back. Returns `false` when the product has no inventory
    /// row at the outlet.
    pub async fn restock(&mut self, product_id: i64, outlet_id: i64, quantity: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?, updated_at = ?
            WHERE product_id = ? AND outlet_id = ?
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .bind(outlet_id)
        .execute(&mut *self.conn)
        .await?;

        debug!(product_id, outlet_id, quantity, "Stock restored");
        Ok(result.rows_affected() == 1)
    }

    /// Appends a stock history row.
    pub async fn record_history(
        &mut self,
        product_id: i64,
        outlet_id: i64,
        quantity: i64,
        action: StockAction,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_history (product_id, outlet_id, quantity, action, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(product_id)
        .bind(outlet_id)
        .bind(quantity)
        .bind(action)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Stock history for a product, oldest first.
    pub async fn history(&mut self, product_id: i64) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT id, product_id, outlet_id, quantity, action, created_at
            FROM stock_history
            WHERE product_id = ?
            ORDER BY id
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}
