//! # Coupon Repository
//!
//! Coupons and the usage rows that make each one single-use per customer.
//!
//! ## Usage Bookkeeping
//! ```text
//! apply:   INSERT coupon_usages (user, coupon, order)   ← UNIQUE(user, coupon)
//!          UPDATE coupons SET used_count + 1 WHERE used_count < usage_limit
//!
//! cancel:  DELETE coupon_usages WHERE order_id = ?
//!          UPDATE coupons SET used_count - 1 WHERE used_count > 0
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use canteen_core::coupon::CouponReward;
use canteen_core::{Coupon, CouponUsage, Money};

const COUPON_COLUMNS: &str = "id, code, description, reward_type, reward_value, min_order_paise, \
     valid_from, valid_until, is_active, usage_limit, used_count, outlet_id, created_at";

/// Fields needed to create a coupon.
#[derive(Debug, Clone)]
pub struct NewCoupon<'a> {
    pub code: &'a str,
    pub description: Option<&'a str>,
    pub reward: CouponReward,
    pub min_order_value: Money,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: i64,
    pub outlet_id: Option<i64>,
}

/// Repository for coupons and coupon usages.
pub struct CouponRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CouponRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CouponRepository { conn }
    }

    /// Looks a coupon up by its exact code.
    pub async fn get_by_code(&mut self, code: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(coupon)
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(coupon)
    }

    /// Inserts an active coupon.
    pub async fn insert(&mut self, coupon: &NewCoupon<'_>) -> DbResult<Coupon> {
        let (reward_type, reward_value) = coupon.reward.to_columns();
        let sql = format!(
            r#"
            INSERT INTO coupons
                (code, description, reward_type, reward_value, min_order_paise, valid_from, valid_until,
                 is_active, usage_limit, used_count, outlet_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, 0, ?, ?)
            RETURNING {COUPON_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Coupon>(&sql)
            .bind(coupon.code)
            .bind(coupon.description)
            .bind(reward_type)
            .bind(reward_value)
            .bind(coupon.min_order_value.paise())
            .bind(coupon.valid_from)
            .bind(coupon.valid_until)
            .bind(coupon.usage_limit)
            .bind(coupon.outlet_id)
            .bind(Utc::now())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row)
    }

    /// Whether the user has already redeemed this coupon.
    pub async fn has_usage(&mut self, user_id: i64, coupon_id: i64) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_usages WHERE user_id = ? AND coupon_id = ?",
        )
        .bind(user_id)
        .bind(coupon_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(count > 0)
    }

    /// Records a redemption.
    pub async fn insert_usage(
        &mut self,
        coupon_id: i64,
        order_id: i64,
        user_id: i64,
        amount: Money,
    ) -> DbResult<CouponUsage> {
        let usage = sqlx::query_as::<_, CouponUsage>(
            r#"
            INSERT INTO coupon_usages (coupon_id, order_id, user_id, amount_paise, used_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, coupon_id, order_id, user_id, amount_paise, used_at
            "#,
        )
        .bind(coupon_id)
        .bind(order_id)
        .bind(user_id)
        .bind(amount.paise())
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(usage)
    }

    /// Bumps `used_count` if the limit still allows it.
    ///
    /// Returns `false` when the coupon is already exhausted.
    pub async fn increment_used(&mut self, coupon_id: i64) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE coupons SET used_count = used_count + 1 WHERE id = ? AND used_count < usage_limit",
        )
        .bind(coupon_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Usage rows attached to an order.
    pub async fn usages_for_order(&mut self, order_id: i64) -> DbResult<Vec<CouponUsage>> {
        let rows = sqlx::query_as::<_, CouponUsage>(
            r#"
            SELECT id, coupon_id, order_id, user_id, amount_paise, used_at
            FROM coupon_usages
            WHERE order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    /// Removes a usage row and gives the coupon its slot back.
    pub async fn reverse_usage(&mut self, usage: &CouponUsage) -> DbResult<()> {
        sqlx::query("DELETE FROM coupon_usages WHERE id = ?")
            .bind(usage.id)
            .execute(&mut *self.conn)
            .await?;

        sqlx::query("UPDATE coupons SET used_count = used_count - 1 WHERE id = ? AND used_count > 0")
            .bind(usage.coupon_id)
            .execute(&mut *self.conn)
            .await?;

        debug!(coupon_id = usage.coupon_id, order_id = usage.order_id, "Coupon usage reversed");
        Ok(())
    }
}
