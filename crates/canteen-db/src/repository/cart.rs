//! # Cart Repository
//!
//! A customer's saved cart. Order placement consumes it by clearing every
//! line inside the order transaction.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Repository for carts and cart items.
pub struct CartRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CartRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CartRepository { conn }
    }

    /// Adds a product to the customer's cart, creating the cart if needed.
    /// Adding a product that is already present bumps its quantity.
    pub async fn add_item(&mut self, customer_id: i64, product_id: i64, quantity: i64) -> DbResult<()> {
        sqlx::query("INSERT INTO carts (customer_id, created_at) VALUES (?, ?) ON CONFLICT (customer_id) DO NOTHING")
            .bind(customer_id)
            .bind(Utc::now())
            .execute(&mut *self.conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            SELECT id, ?, ? FROM carts WHERE customer_id = ?
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(customer_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Number of lines in the customer's cart.
    pub async fn item_count(&mut self, customer_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE c.customer_id = ?
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(count)
    }

    /// Deletes every line of the customer's cart. Returns how many lines
    /// were removed; a customer without a cart is not an error.
    pub async fn clear(&mut self, customer_id: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE customer_id = ?)",
        )
        .bind(customer_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}
