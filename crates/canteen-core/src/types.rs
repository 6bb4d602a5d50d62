//! # Domain Types
//!
//! Core domain types used throughout the canteen backend.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │    Wallet       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  price_paise    │   │  status         │   │  balance_paise  │       │
//! │  │  company_paid   │   │  order_type     │   │  total_used     │       │
//! │  │  outlet_id      │   │  payment_method │   │  last_order     │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ 1..n                │ 1..n           │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌────────▼────────┐       │
//! │  │   Inventory     │   │   OrderItem     │   │WalletTransaction│       │
//! │  │  quantity ≥ 0   │   │  unit_price     │   │  append-only    │       │
//! │  │  threshold      │   │  free_quantity  │   │  signed amount  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ UserFreeQuota   │   │    Coupon       │   │  CouponUsage    │       │
//! │  │ (user, day)     │   │  used ≤ limit   │   │ (user, coupon)  │       │
//! │  │ 0 ≤ used ≤ 5    │   │  validity window│   │  once per user  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Amount Columns
//! Entities keep raw `*_paise: i64` columns exactly as stored; accessor
//! methods wrap them in [`Money`] for arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Role carried in the bearer token and stored on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Staff,
    Admin,
    Superadmin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Staff => "STAFF",
            Role::Admin => "ADMIN",
            Role::Superadmin => "SUPERADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How an order is settled.
///
/// ```text
/// WALLET ──► debit stored balance (DEDUCT ledger row)
/// UPI    ──┐
/// CARD   ──┴► verify gateway signature, keep gateway payment id on order
/// CASH   ──► already settled at the counter
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Wallet,
    Upi,
    Card,
    Cash,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "WALLET",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cash => "CASH",
        }
    }

    /// UPI and CARD are settled through the online payment gateway.
    #[inline]
    pub const fn is_online(&self) -> bool {
        matches!(self, PaymentMethod::Upi | PaymentMethod::Card)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Delivery Slot
// =============================================================================

/// One-hour pickup windows offered by every outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum DeliverySlot {
    #[serde(rename = "SLOT_11_12")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_11_12"))]
    Slot11To12,
    #[serde(rename = "SLOT_12_13")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_12_13"))]
    Slot12To13,
    #[serde(rename = "SLOT_13_14")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_13_14"))]
    Slot13To14,
    #[serde(rename = "SLOT_14_15")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_14_15"))]
    Slot14To15,
    #[serde(rename = "SLOT_15_16")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_15_16"))]
    Slot15To16,
    #[serde(rename = "SLOT_16_17")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SLOT_16_17"))]
    Slot16To17,
}

impl DeliverySlot {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeliverySlot::Slot11To12 => "SLOT_11_12",
            DeliverySlot::Slot12To13 => "SLOT_12_13",
            DeliverySlot::Slot13To14 => "SLOT_13_14",
            DeliverySlot::Slot14To15 => "SLOT_14_15",
            DeliverySlot::Slot15To16 => "SLOT_15_16",
            DeliverySlot::Slot16To17 => "SLOT_16_17",
        }
    }
}

// =============================================================================
// Order Status / Type
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
///            ┌──────────────► DELIVERED ◄──────────────┐
///            │                                          │ (all items delivered
///  PENDING ──┼──► PARTIALLY_DELIVERED ─────────────────┤  or remainder cancelled)
///            │                                          │
///            └──────────────► CANCELLED                 │
///                                                       │
///  PARTIAL_CANCEL is the staff action that closes a PARTIALLY_DELIVERED
///  order; the order itself ends in DELIVERED.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Delivered,
    PartiallyDelivered,
    Cancelled,
    PartialCancel,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::PartiallyDelivered => "PARTIALLY_DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::PartialCancel => "PARTIAL_CANCEL",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Placed by a customer through the app.
    App,
    /// Walk-in order keyed in by staff.
    Manual,
}

/// Per-line delivery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemStatus {
    NotDelivered,
    Delivered,
}

// =============================================================================
// Ledger enums
// =============================================================================

/// Action recorded in the stock history audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAction {
    Add,
    Remove,
    Update,
}

/// Tag on a wallet ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTransactionStatus {
    Recharge,
    Deduct,
    Credit,
    Debit,
}

/// Product menu category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Category {
    Meals,
    Starters,
    Desserts,
    Beverages,
    SpecialFoods,
}

/// How a coupon's `reward_value` column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRewardType {
    /// `reward_value` is basis points of the cart total.
    Percentage,
    /// `reward_value` is an absolute amount in paise.
    Fixed,
}

// =============================================================================
// Entities
// =============================================================================

/// A login identity (customer, staff member or administrator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Outlet a staff member is assigned to.
    pub outlet_id: Option<i64>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// A physical food outlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Outlet {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Customer profile attached to a CUSTOMER user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerDetails {
    pub id: i64,
    pub user_id: i64,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A menu item sold by one outlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Current list price in paise.
    pub price_paise: i64,
    pub outlet_id: i64,
    pub category: Category,
    pub is_veg: bool,
    /// Draws from the customer's daily free quota before being charged.
    pub company_paid: bool,
    pub rating_sum_30d: f64,
    pub rating_count_30d: i64,
    pub trend_score: f64,
    pub rating_sum_lifetime: f64,
    pub rating_count_lifetime: i64,
    pub average_rating_lifetime: f64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// Stock level of one product at one outlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Inventory {
    pub id: i64,
    pub product_id: i64,
    pub outlet_id: i64,
    /// Never negative.
    pub quantity: i64,
    /// Low-stock alert level.
    pub threshold: i64,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    #[inline]
    pub fn is_low(&self) -> bool {
        self.quantity <= self.threshold
    }
}

/// Append-only audit row per inventory mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockHistory {
    pub id: i64,
    pub product_id: i64,
    pub outlet_id: i64,
    pub quantity: i64,
    pub action: StockAction,
    pub created_at: DateTime<Utc>,
}

/// Stored-value balance of one customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Wallet {
    pub id: i64,
    pub customer_id: i64,
    pub balance_paise: i64,
    pub total_recharged_paise: i64,
    pub total_used_paise: i64,
    pub last_recharged: Option<DateTime<Utc>>,
    pub last_order: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_paise(self.balance_paise)
    }
}

/// Wallet ledger row. Never updated after insert.
///
/// `amount_paise` is signed: negative for DEDUCT, positive for
/// RECHARGE / CREDIT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub amount_paise: i64,
    pub method: PaymentMethod,
    pub status: WalletTransactionStatus,
    pub description: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A promotional code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub reward_type: CouponRewardType,
    /// Basis points for PERCENTAGE, paise for FIXED.
    pub reward_value: i64,
    pub min_order_paise: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub usage_limit: i64,
    pub used_count: i64,
    /// `None` means valid at every outlet.
    pub outlet_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    #[inline]
    pub fn min_order_value(&self) -> Money {
        Money::from_paise(self.min_order_paise)
    }
}

/// Record that a user redeemed a coupon on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CouponUsage {
    pub id: i64,
    pub coupon_id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub amount_paise: i64,
    pub used_at: DateTime<Utc>,
}

/// An order. Created only by order commit, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// `None` for manual walk-in orders.
    pub customer_id: Option<i64>,
    pub outlet_id: i64,
    /// Amount payable after quota and coupon.
    pub total_amount_paise: i64,
    pub coupon_discount_paise: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_slot: Option<DeliverySlot>,
    pub is_pre_order: bool,
    pub razorpay_payment_id: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }

    /// Human-facing order number, e.g. `#ORD-000042`.
    pub fn order_number(&self) -> String {
        format_order_number(self.id)
    }
}

/// Formats an order id as `#ORD-%06d`.
pub fn format_order_number(id: i64) -> String {
    format!("#ORD-{:06}", id)
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Price snapshot at order time.
    pub unit_price_paise: i64,
    /// Units drawn from the free quota; reversed on cancellation.
    pub free_quantity: i64,
    pub status: OrderItemStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    #[inline]
    pub fn is_delivered(&self) -> bool {
        self.status == OrderItemStatus::Delivered
    }
}

/// A requested order line before pricing: product and quantity only.
///
/// Prices are always read from the product row, never from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Free units a user consumed on one business day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserFreeQuota {
    pub id: i64,
    pub user_id: i64,
    pub consumption_date: NaiveDate,
    pub quantity_used: i64,
}

/// A customer's rating of one product on one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub rating_overall: f64,
    pub rating_taste: f64,
    pub rating_quality: f64,
    pub rating_quantity: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Weighted score: overall 40%, taste 30%, quality 20%, quantity 10%.
    pub fn weighted_score(&self) -> f64 {
        self.rating_overall * 0.4
            + self.rating_taste * 0.3
            + self.rating_quality * 0.2
            + self.rating_quantity * 0.1
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        assert_eq!(format_order_number(42), "#ORD-000042");
        assert_eq!(format_order_number(1234567), "#ORD-1234567");
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&OrderStatus::PartiallyDelivered).unwrap(), "\"PARTIALLY_DELIVERED\"");
        assert_eq!(serde_json::to_string(&DeliverySlot::Slot13To14).unwrap(), "\"SLOT_13_14\"");
        assert_eq!(serde_json::from_str::<PaymentMethod>("\"UPI\"").unwrap(), PaymentMethod::Upi);
        assert!(serde_json::from_str::<DeliverySlot>("\"SLOT_9_10\"").is_err());
    }

    #[test]
    fn test_online_methods() {
        assert!(PaymentMethod::Upi.is_online());
        assert!(PaymentMethod::Card.is_online());
        assert!(!PaymentMethod::Wallet.is_online());
        assert!(!PaymentMethod::Cash.is_online());
    }

    #[test]
    fn test_feedback_weighted_score() {
        let feedback = Feedback {
            id: 1,
            user_id: 1,
            order_id: 1,
            product_id: 1,
            rating_overall: 5.0,
            rating_taste: 4.0,
            rating_quality: 3.0,
            rating_quantity: 2.0,
            comment: None,
            created_at: Utc::now(),
        };
        assert!((feedback.weighted_score() - 4.0).abs() < 1e-9);
    }
}
