//! # Feedback Repository

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::placeholders;
use crate::error::DbResult;
use canteen_core::Feedback;

const FEEDBACK_COLUMNS: &str = "id, user_id, order_id, product_id, rating_overall, rating_taste, \
     rating_quality, rating_quantity, comment, created_at";

/// A rating about to be stored.
#[derive(Debug, Clone)]
pub struct NewFeedback<'a> {
    pub user_id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub rating_overall: f64,
    pub rating_taste: f64,
    pub rating_quality: f64,
    pub rating_quantity: f64,
    pub comment: Option<&'a str>,
}

/// Repository for product feedback.
pub struct FeedbackRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> FeedbackRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        FeedbackRepository { conn }
    }

    /// Which of `product_ids` already have feedback on this order.
    pub async fn rated_products(&mut self, order_id: i64, product_ids: &[i64]) -> DbResult<Vec<i64>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT product_id FROM feedback WHERE order_id = ? AND product_id IN ({}) ORDER BY product_id",
            placeholders(product_ids.len())
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(order_id);
        for id in product_ids {
            query = query.bind(*id);
        }

        Ok(query.fetch_all(&mut *self.conn).await?)
    }

    /// Stores one rating.
    pub async fn insert(&mut self, feedback: &NewFeedback<'_>) -> DbResult<Feedback> {
        let sql = format!(
            r#"
            INSERT INTO feedback
                (user_id, order_id, product_id, rating_overall, rating_taste, rating_quality, rating_quantity,
                 comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {FEEDBACK_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Feedback>(&sql)
            .bind(feedback.user_id)
            .bind(feedback.order_id)
            .bind(feedback.product_id)
            .bind(feedback.rating_overall)
            .bind(feedback.rating_taste)
            .bind(feedback.rating_quality)
            .bind(feedback.rating_quantity)
            .bind(feedback.comment)
            .bind(Utc::now())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row)
    }

    /// Every rating of a product, optionally only those created at or
    /// after `since`.
    pub async fn for_product(&mut self, product_id: i64, since: Option<DateTime<Utc>>) -> DbResult<Vec<Feedback>> {
        let rows = match since {
            Some(since) => {
                let sql = format!(
                    "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE product_id = ? AND created_at >= ? ORDER BY id"
                );
                sqlx::query_as::<_, Feedback>(&sql)
                    .bind(product_id)
                    .bind(since)
                    .fetch_all(&mut *self.conn)
                    .await?
            }
            None => {
                let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE product_id = ? ORDER BY id");
                sqlx::query_as::<_, Feedback>(&sql)
                    .bind(product_id)
                    .fetch_all(&mut *self.conn)
                    .await?
            }
        };

        Ok(rows)
    }
}
