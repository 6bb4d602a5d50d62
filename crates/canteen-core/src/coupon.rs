//! # Coupon Evaluation
//!
//! Eligibility checks and discount math for promotional codes.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. exists && is_active          else INVALID_COUPON                    │
//! │  2. valid_from ≤ now ≤ valid_until  else COUPON_EXPIRED                 │
//! │  3. outlet restriction matches   else COUPON_WRONG_OUTLET               │
//! │  4. no prior usage by this user  else COUPON_ALREADY_USED               │
//! │  5. used_count < usage_limit     else COUPON_LIMIT_REACHED              │
//! │  6. cart total ≥ min order value else BELOW_MIN_ORDER                   │
//! │                                                                         │
//! │  The first failing check wins; clients rely on this order.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reward Encoding
//! Stored coupons carry an explicit [`CouponRewardType`]. Values imported
//! from the legacy single-number encoding go through
//! [`CouponReward::from_reward_value`].

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, BPS_SCALE};
use crate::types::{Coupon, CouponRewardType};

// =============================================================================
// Reward
// =============================================================================

/// What a coupon takes off the cart total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponReward {
    /// Share of the total in basis points, rounded half up.
    Percentage { bps: u32 },
    /// Absolute amount, capped at the total.
    Fixed(Money),
}

impl CouponReward {
    /// Converts a legacy decimal reward value.
    ///
    /// - `0 < v < 1`: fraction of the total (0.1 = 10%)
    /// - `v >= 1`: absolute rupees
    /// - `v <= 0`: no discount
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::coupon::CouponReward;
    /// use canteen_core::Money;
    ///
    /// assert_eq!(CouponReward::from_reward_value(0.1), CouponReward::Percentage { bps: 1000 });
    /// assert_eq!(CouponReward::from_reward_value(100.0), CouponReward::Fixed(Money::from_paise(10000)));
    /// assert_eq!(CouponReward::from_reward_value(-3.0), CouponReward::Fixed(Money::zero()));
    /// ```
    pub fn from_reward_value(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            CouponReward::Fixed(Money::zero())
        } else if value < 1.0 {
            CouponReward::Percentage {
                bps: (value * BPS_SCALE as f64).round() as u32,
            }
        } else {
            CouponReward::Fixed(Money::from_rupees_f64(value))
        }
    }

    /// Reward described by a stored coupon row.
    pub fn of(coupon: &Coupon) -> Self {
        match coupon.reward_type {
            CouponRewardType::Percentage => CouponReward::Percentage {
                bps: coupon.reward_value.clamp(0, BPS_SCALE) as u32,
            },
            CouponRewardType::Fixed => {
                CouponReward::Fixed(Money::from_paise(coupon.reward_value.max(0)))
            }
        }
    }

    /// Discount on `total`; never exceeds `total`.
    pub fn discount(&self, total: Money) -> Money {
        if !total.is_positive() {
            return Money::zero();
        }
        let discount = match *self {
            CouponReward::Percentage { bps } => total.percentage(bps),
            CouponReward::Fixed(amount) => amount,
        };
        discount.min(total).max(Money::zero())
    }

    /// Column pair used to persist this reward.
    pub fn to_columns(&self) -> (CouponRewardType, i64) {
        match *self {
            CouponReward::Percentage { bps } => (CouponRewardType::Percentage, bps as i64),
            CouponReward::Fixed(amount) => (CouponRewardType::Fixed, amount.paise()),
        }
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// Facts about the redemption attempt, gathered by the caller.
#[derive(Debug, Clone, Copy)]
pub struct CouponContext {
    pub now: DateTime<Utc>,
    pub outlet_id: i64,
    /// A CouponUsage row already exists for (user, coupon).
    pub already_used_by_user: bool,
    /// Cart total before the coupon.
    pub cart_total: Money,
}

/// Runs every eligibility check in order and returns the discount.
///
/// `coupon` is `None` when no row matched the code.
pub fn evaluate(coupon: Option<&Coupon>, ctx: &CouponContext) -> CoreResult<Money> {
    let coupon = match coupon {
        Some(c) if c.is_active => c,
        _ => return Err(CoreError::InvalidCoupon),
    };

    if ctx.now < coupon.valid_from || ctx.now > coupon.valid_until {
        return Err(CoreError::CouponExpired);
    }

    if let Some(outlet_id) = coupon.outlet_id {
        if outlet_id != ctx.outlet_id {
            return Err(CoreError::CouponWrongOutlet);
        }
    }

    if ctx.already_used_by_user {
        return Err(CoreError::CouponAlreadyUsed);
    }

    if coupon.used_count >= coupon.usage_limit {
        return Err(CoreError::CouponLimitReached);
    }

    if ctx.cart_total < coupon.min_order_value() {
        return Err(CoreError::BelowMinOrder {
            min: coupon.min_order_value(),
            total: ctx.cart_total,
        });
    }

    Ok(CouponReward::of(coupon).discount(ctx.cart_total))
}

// =============================================================================
// Unit Tests
// =============================================================================
