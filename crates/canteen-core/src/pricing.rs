//! # Pricing Engine
//!
//! Partitions an order into free / paid-company / regular buckets and
//! produces the payable total.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Pricing Pipeline                               │
//! │                                                                         │
//! │  Lines (product price snapshot, company_paid flag)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────┐    company-paid?    ┌───────────────────────┐         │
//! │  │  partition   │───── yes ──────────►│ quota::allocate_free  │         │
//! │  └──────┬───────┘                     └──────────┬────────────┘         │
//! │         │ no                               free  │  charged             │
//! │         ▼                                  ▼     ▼                      │
//! │   regularItems                    freeItems   paidCompanyItems          │
//! │         │                              │            │                   │
//! │         └──────────────┬───────────────┘────────────┘                   │
//! │                        ▼                                                │
//! │        original = paidCompanyAmount + regularAmount                     │
//! │                        │                                                │
//! │                        ▼                                                │
//! │        final = max(0, original - couponDiscount)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Free Amount
//! `freeAmount` is the list-price value of the waived units. It is shown to
//! the customer and never charged.

use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::quota::{allocate_free, QuotaAllocation};

// =============================================================================
// Inputs
// =============================================================================

/// An order line joined with its product row.
#[derive(Debug, Clone)]
pub struct PricingLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Current product price; becomes the order item's price snapshot.
    pub unit_price: Money,
    pub company_paid: bool,
}

// =============================================================================
// Outputs
// =============================================================================

/// One entry in a breakdown bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BucketLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Amount charged for this entry; zero for free entries.
    pub amount: Money,
}

/// Structured pricing breakdown returned with a placed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub free_items: Vec<BucketLine>,
    pub paid_company_items: Vec<BucketLine>,
    pub regular_items: Vec<BucketLine>,
    pub free_amount: Money,
    pub paid_company_amount: Money,
    pub regular_amount: Money,
    /// All company-paid units requested, free or charged.
    pub total_company_paid_qty: i64,
}

impl PricingBreakdown {
    /// Amount before any coupon: free units contribute nothing.
    #[inline]
    pub fn original_total(&self) -> Money {
        self.paid_company_amount + self.regular_amount
    }
}

/// Per-line result, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    /// Units drawn from the daily quota.
    pub free_quantity: i64,
}

/// Everything the order commit needs from pricing.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub breakdown: PricingBreakdown,
    pub quota: QuotaAllocation,
}

/// Totals after the coupon step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub original_total: Money,
    pub coupon_discount: Money,
    pub final_total: Money,
}

impl OrderTotals {
    /// Applies a discount, flooring the payable amount at zero.
    pub fn new(original_total: Money, coupon_discount: Money) -> Self {
        OrderTotals {
            original_total,
            coupon_discount,
            final_total: original_total.saturating_sub_to_zero(coupon_discount),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Prices a cart against the customer's quota usage for the day.
///
/// `quota_used` is the `quantity_used` value already on today's quota row
/// (0 when the row does not exist yet).
pub fn price_cart(lines: &[PricingLine], quota_used: i64) -> PricedCart {
    let company_quantities: Vec<i64> = lines
        .iter()
        .map(|l| if l.company_paid { l.quantity } else { 0 })
        .collect();
    let quota = allocate_free(quota_used, &company_quantities);

    let mut breakdown = PricingBreakdown::default();
    let mut priced = Vec::with_capacity(lines.len());

    for (line, &free) in lines.iter().zip(&quota.free_per_line) {
        if line.company_paid {
            breakdown.total_company_paid_qty += line.quantity;

            if free > 0 {
                breakdown.free_amount += line.unit_price * free;
                breakdown.free_items.push(bucket(line, free, Money::zero()));
            }

            let charged = line.quantity - free;
            if charged > 0 {
                let amount = line.unit_price * charged;
                breakdown.paid_company_amount += amount;
                breakdown.paid_company_items.push(bucket(line, charged, amount));
            }
        } else {
            let amount = line.unit_price * line.quantity;
            breakdown.regular_amount += amount;
            breakdown.regular_items.push(bucket(line, line.quantity, amount));
        }

        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            free_quantity: free,
        });
    }

    PricedCart {
        lines: priced,
        breakdown,
        quota,
    }
}

fn bucket(line: &PricingLine, quantity: i64, amount: Money) -> BucketLine {
    BucketLine {
        product_id: line.product_id,
        name: line.name.clone(),
        quantity,
        unit_price: line.unit_price,
        amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64, price: i64, company_paid: bool) -> PricingLine {
        PricingLine {
            product_id,
            name: format!("Item {}", product_id),
            quantity,
            unit_price: Money::from_paise(price),
            company_paid,
        }
    }

    #[test]
    fn test_free_quota_boundary() {
        // 3 used today, 4 company-paid units at ₹50
        let cart = price_cart(&[line(1, 4, 5000, true)], 3);

        assert_eq!(cart.lines[0].free_quantity, 2);
        assert_eq!(cart.breakdown.paid_company_amount.paise(), 10000);
        assert_eq!(cart.breakdown.free_amount.paise(), 10000);
        assert_eq!(cart.breakdown.total_company_paid_qty, 4);
        assert_eq!(cart.breakdown.original_total().paise(), 10000);
        assert_eq!(cart.quota.total_free, 2);
    }

    #[test]
    fn test_regular_items_never_draw_quota() {
        let cart = price_cart(&[line(1, 2, 3000, false), line(2, 1, 4000, true)], 0);

        assert_eq!(cart.lines[0].free_quantity, 0);
        assert_eq!(cart.lines[1].free_quantity, 1);
        assert_eq!(cart.breakdown.regular_amount.paise(), 6000);
        assert_eq!(cart.breakdown.paid_company_amount, Money::zero());
        assert_eq!(cart.breakdown.original_total().paise(), 6000);
        assert_eq!(cart.breakdown.free_items.len(), 1);
        assert!(cart.breakdown.paid_company_items.is_empty());
    }

    #[test]
    fn test_split_line_appears_in_both_buckets() {
        let cart = price_cart(&[line(1, 3, 2500, true)], 4);

        assert_eq!(cart.breakdown.free_items[0].quantity, 1);
        assert_eq!(cart.breakdown.free_items[0].amount, Money::zero());
        assert_eq!(cart.breakdown.paid_company_items[0].quantity, 2);
        assert_eq!(cart.breakdown.paid_company_items[0].amount.paise(), 5000);
    }

    #[test]
    fn test_totals_floor_at_zero() {
        let totals = OrderTotals::new(Money::from_paise(8000), Money::from_paise(10000));
        assert_eq!(totals.final_total, Money::zero());

        let totals = OrderTotals::new(Money::from_paise(50000), Money::from_paise(5000));
        assert_eq!(totals.final_total.paise(), 45000);
    }

    #[test]
    fn test_breakdown_serializes_camel_case() {
        let cart = price_cart(&[line(1, 1, 5000, true)], 0);
        let json = serde_json::to_value(&cart.breakdown).unwrap();
        assert_eq!(json["freeItems"][0]["productId"], 1);
        assert_eq!(json["totalCompanyPaidQty"], 1);
        assert_eq!(json["paidCompanyAmount"], 0);
    }
}
