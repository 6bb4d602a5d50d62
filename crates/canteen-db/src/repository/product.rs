//! # Product Repository
//!
//! Menu items and their rating aggregates.
//!
//! ## Price Snapshots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.price_paise ──(read at commit)──► order_items.unit_price_paise│
//! │                                                                         │
//! │  Later price edits never touch existing order lines; every refund is   │
//! │  computed from the snapshot, not from the product row.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use super::placeholders;
use crate::error::DbResult;
use canteen_core::{Category, Money, Product};

const PRODUCT_COLUMNS: &str = "id, name, description, price_paise, outlet_id, category, is_veg, \
     company_paid, rating_sum_30d, rating_count_30d, trend_score, rating_sum_lifetime, \
     rating_count_lifetime, average_rating_lifetime, created_at";

/// Fields needed to create a product.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Money,
    pub outlet_id: i64,
    pub category: Category,
    pub is_veg: bool,
    pub company_paid: bool,
}

/// Recomputed rating aggregates for one product.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingStats {
    pub sum_30d: f64,
    pub count_30d: i64,
    pub trend_score: f64,
    pub sum_lifetime: f64,
    pub count_lifetime: i64,
    pub average_lifetime: f64,
}

/// Repository for product database operations.
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Loads every product in `ids`. Missing IDs are simply absent from
    /// the result; callers decide whether that is an error.
    pub async fn get_many(&mut self, ids: &[i64]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, Product>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let products = query.fetch_all(&mut *self.conn).await?;

        debug!(requested = ids.len(), found = products.len(), "Loaded products");
        Ok(products)
    }

    /// Inserts a product.
    pub async fn insert(&mut self, product: &NewProduct<'_>) -> DbResult<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (name, description, price_paise, outlet_id, category, is_veg, company_paid, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(product.name)
            .bind(product.description)
            .bind(product.price.paise())
            .bind(product.outlet_id)
            .bind(product.category)
            .bind(product.is_veg)
            .bind(product.company_paid)
            .bind(Utc::now())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Overwrites the rating aggregate columns.
    pub async fn update_rating_stats(&mut self, product_id: i64, stats: &RatingStats) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE products SET
                rating_sum_30d = ?,
                rating_count_30d = ?,
                trend_score = ?,
                rating_sum_lifetime = ?,
                rating_count_lifetime = ?,
                average_rating_lifetime = ?
            WHERE id = ?
            "#,
        )
        .bind(stats.sum_30d)
        .bind(stats.count_30d)
        .bind(stats.trend_score)
        .bind(stats.sum_lifetime)
        .bind(stats.count_lifetime)
        .bind(stats.average_lifetime)
        .bind(product_id)
        .execute(&mut *self.conn)
        .await?;

        debug!(product_id, trend_score = stats.trend_score, "Product rating stats updated");
        Ok(())
    }
}
