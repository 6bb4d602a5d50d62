//! # Money
//!
//! Every amount in the canteen (prices, coupon discounts, wallet balances,
//! refunds) is an `i64` count of paise wrapped in [`Money`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  wallet ₹100.00, three debits of ₹33.33                                 │
//! │                                                                         │
//! │    f64:    100.0 - 33.33 - 33.33 - 33.33 = 0.010000000000005116         │
//! │    paise:  10000 - 3333  - 3333  - 3333  = 1                            │
//! │                                                                         │
//! │  Percentages are basis points; a 10% coupon on ₹333.35 is               │
//! │    (33335 × 1000 + 5000) / 10000 = 3334 paise (half up)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use canteen_core::money::Money;
//!
//! // Create from paise (preferred)
//! let price = Money::from_paise(4550); // ₹45.50
//!
//! // Arithmetic operations
//! let doubled = price * 2;                      // ₹91.00
//! let total = price + Money::from_paise(500);   // ₹50.50
//! assert_eq!(total.paise(), 5050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for ledger debits
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer**: `{"totalAmount": 45000}`
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_paise ──► PricedLine.unit_price ──► bucket amounts       │
/// │                                                                         │
/// │  original total ──► coupon discount ──► final total ──► wallet debit    │
/// │                                                                         │
/// │  OrderItem.unit_price_paise ──► partial-cancel refund ──► wallet credit │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the rupee part should be negative.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Converts a decimal rupee amount to paise, rounding to the nearest paisa.
    ///
    /// Only used at the edge where legacy decimal values (coupon reward
    /// values entered by admins) enter the system.
    pub fn from_rupees_f64(rupees: f64) -> Self {
        Money((rupees * 100.0).round() as i64)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the negated value (credit ↔ debit in the wallet ledger).
    #[inline]
    pub const fn negate(&self) -> Self {
        Money(-self.0)
    }

    /// Subtracts and floors the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::money::Money;
    ///
    /// let total = Money::from_paise(8000);
    /// let discount = Money::from_paise(10000);
    /// assert_eq!(total.saturating_sub_to_zero(discount), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(5000); // ₹50.00
    /// assert_eq!(unit_price.multiply_quantity(2).paise(), 10000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use canteen_core::money::Money;
    ///
    /// let cart = Money::from_paise(50000);          // ₹500.00
    /// assert_eq!(cart.percentage(1000).paise(), 5000); // 10% = ₹50.00
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        // i128 so a large amount times 10000 bps cannot overflow
        let part = (self.0 as i128 * bps as i128 + (BPS_SCALE / 2) as i128) / BPS_SCALE as i128;
        Money::from_paise(part as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹10.99`. Used in log lines and user-facing messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
