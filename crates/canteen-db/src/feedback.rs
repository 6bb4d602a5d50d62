//! # Product Feedback
//!
//! Customers rate the products of their own orders, once per product per
//! order. Rating aggregates on the product row are recomputed afterwards by
//! a background job.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit(user, order, items)                                             │
//! │       │                                                                 │
//! │       ├── validate ratings (1-5) and comments                           │
//! │       ├── BEGIN                                                         │
//! │       │     order belongs to user?      no ──► 404                      │
//! │       │     products part of order?     no ──► 400                      │
//! │       │     already rated?              yes ─► 400 (ids listed)         │
//! │       │     INSERT feedback rows                                        │
//! │       ├── COMMIT                                                        │
//! │       └── tasks.spawn("product_stats") ─── not awaited                  │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │        30-day sum / count / trend, lifetime sum / count / average       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::ordering::OrderResult;
use crate::pool::Database;
use crate::repository::feedback::NewFeedback;
use crate::repository::product::RatingStats;
use crate::repository::{FeedbackRepository, OrderRepository, ProductRepository, UserRepository};
use crate::tasks::BackgroundTasks;
use canteen_core::validation::{validate_comment, validate_id, validate_rating};
use canteen_core::{CoreError, Feedback, ValidationError};

/// Window of the trend score.
pub const TREND_WINDOW_DAYS: i64 = 30;

/// One product rating in a submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub product_id: i64,
    pub rating_overall: f64,
    #[serde(default)]
    pub rating_taste: Option<f64>,
    #[serde(default)]
    pub rating_quality: Option<f64>,
    #[serde(default)]
    pub rating_quantity: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Stores ratings and keeps product aggregates current.
#[derive(Debug, Clone)]
pub struct FeedbackService {
    db: Database,
    tasks: BackgroundTasks,
}

impl FeedbackService {
    pub fn new(db: Database, tasks: BackgroundTasks) -> Self {
        FeedbackService { db, tasks }
    }

    /// Records ratings for products of one of the caller's orders.
    ///
    /// Missing sub-ratings are stored as 0 and only count through their
    /// weight; provided ones must be 1-5.
    pub async fn submit(&self, user_id: i64, order_id: i64, items: &[FeedbackItem]) -> OrderResult<Vec<Feedback>> {
        validate_submission(order_id, items)?;

        let mut tx = self.db.begin().await?;

        let customer = UserRepository::new(&mut tx)
            .customer_by_user(user_id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;
        OrderRepository::new(&mut tx)
            .get_for_customer(order_id, customer.id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;

        let ordered: HashSet<i64> = OrderRepository::new(&mut tx)
            .items(order_id)
            .await?
            .iter()
            .map(|i| i.product_id)
            .collect();
        let foreign: Vec<i64> = items
            .iter()
            .map(|i| i.product_id)
            .filter(|id| !ordered.contains(id))
            .collect();
        if !foreign.is_empty() {
            return Err(CoreError::ProductsNotInOrder(foreign).into());
        }

        let product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        let already = FeedbackRepository::new(&mut tx).rated_products(order_id, &product_ids).await?;
        if !already.is_empty() {
            return Err(CoreError::AlreadyRated(already).into());
        }

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let row = FeedbackRepository::new(&mut tx)
                .insert(&NewFeedback {
                    user_id,
                    order_id,
                    product_id: item.product_id,
                    rating_overall: item.rating_overall,
                    rating_taste: item.rating_taste.unwrap_or(0.0),
                    rating_quality: item.rating_quality.unwrap_or(0.0),
                    rating_quantity: item.rating_quantity.unwrap_or(0.0),
                    comment: item.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()),
                })
                .await?;
            stored.push(row);
        }

        tx.commit().await?;
        info!(user_id, order_id, products = stored.len(), "Feedback submitted");

        let db = self.db.clone();
        self.tasks.spawn("product_stats", async move {
            for product_id in product_ids {
                recompute_product_stats(&db, product_id).await?;
            }
            Ok::<(), crate::error::DbError>(())
        });

        Ok(stored)
    }
}

fn validate_submission(order_id: i64, items: &[FeedbackItem]) -> Result<(), ValidationError> {
    validate_id("orderId", order_id)?;
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for item in items {
        validate_id("productId", item.product_id)?;
        if !seen.insert(item.product_id) {
            return Err(ValidationError::Duplicate {
                field: "productId".to_string(),
                value: item.product_id.to_string(),
            });
        }
        validate_rating("ratingOverall", item.rating_overall)?;
        for (field, rating) in [
            ("ratingTaste", item.rating_taste),
            ("ratingQuality", item.rating_quality),
            ("ratingQuantity", item.rating_quantity),
        ] {
            if let Some(rating) = rating {
                validate_rating(field, rating)?;
            }
        }
        validate_comment(item.comment.as_deref())?;
    }
    Ok(())
}

/// Recomputes and stores a product's rating aggregates.
pub async fn recompute_product_stats(db: &Database, product_id: i64) -> DbResult<RatingStats> {
    let since = Utc::now() - Duration::days(TREND_WINDOW_DAYS);
    let mut conn = db.pool().acquire().await?;

    let mut feedback = FeedbackRepository::new(&mut conn);
    let recent = feedback.for_product(product_id, Some(since)).await?;
    let lifetime = feedback.for_product(product_id, None).await?;

    let stats = rating_stats(&recent, &lifetime);
    ProductRepository::new(&mut conn)
        .update_rating_stats(product_id, &stats)
        .await?;

    debug!(product_id, trend = stats.trend_score, average = stats.average_lifetime, "Product stats updated");
    Ok(stats)
}

/// Aggregates over weighted scores. Averages are 0 without ratings.
pub fn rating_stats(recent: &[Feedback], lifetime: &[Feedback]) -> RatingStats {
    let sum_30d: f64 = recent.iter().map(Feedback::weighted_score).sum();
    let sum_lifetime: f64 = lifetime.iter().map(Feedback::weighted_score).sum();
    let count_30d = recent.len() as i64;
    let count_lifetime = lifetime.len() as i64;

    RatingStats {
        sum_30d,
        count_30d,
        trend_score: if count_30d > 0 { sum_30d / count_30d as f64 } else { 0.0 },
        sum_lifetime,
        count_lifetime,
        average_lifetime: if count_lifetime > 0 {
            sum_lifetime / count_lifetime as f64
        } else {
            0.0
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
