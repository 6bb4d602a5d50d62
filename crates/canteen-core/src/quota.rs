//! # Daily Free Quota
//!
//! Splits company-paid units into free and charged portions against the
//! customer's per-day allowance.
//!
//! ## Greedy Allocation
//! ```text
//! used today = 3, limit = 5  ──►  remaining = 2
//!
//!   line 0: company-paid × 4   ──►  free 2, charged 2   (remaining 0)
//!   line 1: regular      × 1   ──►  free 0              (never draws)
//!   line 2: company-paid × 1   ──►  free 0, charged 1
//!
//! quota row after commit: used = 3 + 2 = 5
//! ```
//!
//! Lines are served strictly in request order; the first company-paid lines
//! soak up the allowance.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::DAILY_FREE_LIMIT;

/// Result of splitting requested company-paid units against the allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaAllocation {
    /// Free units per requested line, same order and length as the input.
    pub free_per_line: Vec<i64>,
    /// Sum of `free_per_line`; the amount the quota row grows by.
    pub total_free: i64,
    /// Allowance left after this allocation.
    pub remaining_after: i64,
}

/// Allowance still available when `used` units were already consumed.
///
/// ## Example
/// ```rust
/// use canteen_core::quota::remaining;
///
/// assert_eq!(remaining(0), 5);
/// assert_eq!(remaining(5), 0);
/// assert_eq!(remaining(7), 0);
/// ```
#[inline]
pub fn remaining(used: i64) -> i64 {
    (DAILY_FREE_LIMIT - used).max(0)
}

/// Greedily assigns free units to lines in request order.
///
/// `company_paid_quantities[i]` is the quantity of line `i` that may draw
/// from the quota; pass 0 for regular lines so indexes stay aligned.
pub fn allocate_free(used: i64, company_paid_quantities: &[i64]) -> QuotaAllocation {
    let mut left = remaining(used);
    let mut free_per_line = Vec::with_capacity(company_paid_quantities.len());

    for &qty in company_paid_quantities {
        let free = qty.max(0).min(left);
        left -= free;
        free_per_line.push(free);
    }

    QuotaAllocation {
        total_free: free_per_line.iter().sum(),
        free_per_line,
        remaining_after: left,
    }
}

/// Quota value after giving back `qty` free units, if the restore is allowed.
///
/// Returns `None` when `qty` is not positive or exceeds what was used,
/// which guards against double restores driving the row negative.
///
/// ## Example
/// ```rust
/// use canteen_core::quota::restored;
///
/// assert_eq!(restored(5, 2), Some(3));
/// assert_eq!(restored(1, 2), None);
/// assert_eq!(restored(3, 0), None);
/// ```
#[inline]
pub fn restored(used: i64, qty: i64) -> Option<i64> {
    (qty > 0 && used >= qty).then(|| used - qty)
}

/// Calendar day an instant falls on in the business time zone.
///
/// Quota rows are keyed by this day, so a canteen at UTC+05:30 rolls the
/// allowance over at local midnight rather than 05:30 IST.
pub fn business_day(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (now + Duration::minutes(utc_offset_minutes as i64)).date_naive()
}

// =============================================================================
// Quota Snapshot
// =============================================================================

/// Today's quota as shown to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub remaining_quota: i64,
    pub quantity_used: i64,
    pub total_quota: i64,
}

impl QuotaStatus {
    pub fn from_used(used: i64) -> Self {
        QuotaStatus {
            remaining_quota: remaining(used),
            quantity_used: used,
            total_quota: DAILY_FREE_LIMIT,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_boundary_three_used_four_requested() {
        let allocation = allocate_free(3, &[4]);
        assert_eq!(allocation.free_per_line, vec![2]);
        assert_eq!(allocation.total_free, 2);
        assert_eq!(allocation.remaining_after, 0);
    }

    #[test]
    fn test_allocation_follows_request_order() {
        let allocation = allocate_free(0, &[3, 0, 4]);
        assert_eq!(allocation.free_per_line, vec![3, 0, 2]);
        assert_eq!(allocation.total_free, 5);
    }

    #[test]
    fn test_exhausted_quota_grants_nothing() {
        let allocation = allocate_free(5, &[2, 2]);
        assert_eq!(allocation.free_per_line, vec![0, 0]);
        assert_eq!(allocation.total_free, 0);
    }

    #[test]
    fn test_empty_request_is_noop() {
        let allocation = allocate_free(2, &[]);
        assert!(allocation.free_per_line.is_empty());
        assert_eq!(allocation.total_free, 0);
        assert_eq!(allocation.remaining_after, 3);
    }

    #[test]
    fn test_used_plus_granted_never_exceeds_limit() {
        for used in 0..=DAILY_FREE_LIMIT {
            for a in 0..7 {
                for b in 0..7 {
                    let allocation = allocate_free(used, &[a, b]);
                    assert!(used + allocation.total_free <= DAILY_FREE_LIMIT);
                    assert!(allocation.free_per_line[0] <= a);
                    assert!(allocation.free_per_line[1] <= b);
                }
            }
        }
    }

    #[test]
    fn test_restore_guards() {
        assert_eq!(restored(5, 5), Some(0));
        assert_eq!(restored(2, 3), None);
        assert_eq!(restored(2, -1), None);
    }

    #[test]
    fn test_business_day_uses_offset() {
        // 20:00 UTC is 01:30 next day in IST.
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        assert_eq!(business_day(now, 0), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(business_day(now, 330), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_quota_status() {
        let status = QuotaStatus::from_used(3);
        assert_eq!(status.remaining_quota, 2);
        assert_eq!(status.total_quota, 5);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["remainingQuota"], 2);
        assert_eq!(json["quantityUsed"], 3);
    }
}
