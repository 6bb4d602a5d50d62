//! # Order Status Machine
//!
//! Transition guards and refund math for customer and staff actions.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action               From                       To                     │
//! │  ───────────────────  ─────────────────────────  ─────────────────────  │
//! │  customer cancel      PENDING                    CANCELLED              │
//! │  staff CANCELLED      PENDING                    CANCELLED              │
//! │  staff DELIVERED      PENDING, PARTIALLY_DEL.    DELIVERED              │
//! │  staff PARTIALLY_     PENDING, PARTIALLY_DEL.    PARTIALLY_DELIVERED    │
//! │        DELIVERED                                 or DELIVERED (all done)│
//! │  staff PARTIAL_CANCEL PARTIALLY_DELIVERED        DELIVERED (closed)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! CANCELLED and DELIVERED are terminal. A partial cancel leaves its
//! cancelled items NOT_DELIVERED, so the order status, not the item
//! statuses, decides whether delivery may continue.
//!
//! ## Refund Channel
//! App orders are refunded into the customer's wallet. Manual walk-in
//! orders have no customer and are never refunded here.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Order, OrderItem, OrderStatus, OrderType};

// =============================================================================
// Staff Action
// =============================================================================

/// Status requested by staff through the update-order endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffAction {
    Cancelled,
    Delivered,
    PartiallyDelivered,
    PartialCancel,
}

impl FromStr for StaffAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CANCELLED" => Ok(StaffAction::Cancelled),
            "DELIVERED" => Ok(StaffAction::Delivered),
            "PARTIALLY_DELIVERED" => Ok(StaffAction::PartiallyDelivered),
            "PARTIAL_CANCEL" => Ok(StaffAction::PartialCancel),
            other => Err(CoreError::InvalidStatusValue(other.to_string())),
        }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Customers may only cancel orders that are still PENDING.
pub fn ensure_customer_cancellable(status: OrderStatus) -> CoreResult<()> {
    if status != OrderStatus::Pending {
        return Err(CoreError::OrderNotCancellable { status });
    }
    Ok(())
}

/// Staff cancellation is also restricted to PENDING.
pub fn ensure_staff_cancellable(status: OrderStatus) -> CoreResult<()> {
    if status != OrderStatus::Pending {
        return Err(CoreError::CannotCancel { status });
    }
    Ok(())
}

/// Delivery (full or partial) continues only from PENDING or
/// PARTIALLY_DELIVERED.
pub fn ensure_deliverable(status: OrderStatus) -> CoreResult<()> {
    match status {
        OrderStatus::Pending | OrderStatus::PartiallyDelivered => Ok(()),
        OrderStatus::Cancelled => Err(CoreError::CannotDeliverCancelled),
        _ => Err(CoreError::AlreadyDelivered),
    }
}

/// Partial cancel closes a PARTIALLY_DELIVERED order.
pub fn ensure_partial_cancellable(status: OrderStatus) -> CoreResult<()> {
    if status != OrderStatus::PartiallyDelivered {
        return Err(CoreError::CannotPartialCancel { status });
    }
    Ok(())
}

/// Whether cancelling this order credits a customer wallet.
#[inline]
pub fn refunds_to_wallet(order: &Order) -> bool {
    order.order_type == OrderType::App && order.customer_id.is_some()
}

// =============================================================================
// Item Math
// =============================================================================

/// Free units drawn from the quota by these items.
pub fn free_units(items: &[&OrderItem]) -> i64 {
    items.iter().map(|i| i.free_quantity.max(0)).sum()
}

/// Status after marking items delivered: DELIVERED once every item is.
pub fn status_after_delivery(items: &[OrderItem]) -> OrderStatus {
    if items.iter().all(OrderItem::is_delivered) {
        OrderStatus::Delivered
    } else {
        OrderStatus::PartiallyDelivered
    }
}

/// Refund owed when the undelivered remainder of an order is cancelled.
///
/// Counts only units that were charged (free units are given back to the
/// quota instead) and never exceeds what the order cost.
///
/// ## Example
/// ```rust
/// use canteen_core::order::partial_cancel_refund;
/// use canteen_core::Money;
///
/// // 2 undelivered units at ₹40, 1 of them free, order paid ₹200
/// let refund = partial_cancel_refund(&[(2, 1, Money::from_paise(4000))], Money::from_paise(20000));
/// assert_eq!(refund.paise(), 4000);
/// ```
pub fn partial_cancel_refund(undelivered: &[(i64, i64, Money)], order_total: Money) -> Money {
    let owed: Money = undelivered
        .iter()
        .map(|&(quantity, free, unit_price)| unit_price * (quantity - free.max(0)).max(0))
        .sum();
    owed.min(order_total).max(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderItemStatus;
    use chrono::Utc;

    fn item(id: i64, status: OrderItemStatus) -> OrderItem {
        OrderItem {
            id,
            order_id: 1,
            product_id: id,
            quantity: 1,
            unit_price_paise: 1000,
            free_quantity: 0,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_staff_action() {
        assert_eq!(
            "PARTIAL_CANCEL".parse::<StaffAction>().unwrap(),
            StaffAction::PartialCancel
        );
        let err = "SHIPPED".parse::<StaffAction>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid status value");
    }

    #[test]
    fn test_cancel_guards() {
        assert!(ensure_customer_cancellable(OrderStatus::Pending).is_ok());
        assert_eq!(
            ensure_customer_cancellable(OrderStatus::Delivered)
                .unwrap_err()
                .to_string(),
            "Only pending orders can be cancelled"
        );
        assert_eq!(
            ensure_staff_cancellable(OrderStatus::PartiallyDelivered)
                .unwrap_err()
                .to_string(),
            "Cannot cancel order. Order status is PARTIALLY_DELIVERED"
        );
    }

    #[test]
    fn test_delivery_guards() {
        assert!(ensure_deliverable(OrderStatus::Pending).is_ok());
        assert!(ensure_deliverable(OrderStatus::PartiallyDelivered).is_ok());
        assert!(matches!(
            ensure_deliverable(OrderStatus::Cancelled),
            Err(CoreError::CannotDeliverCancelled)
        ));
        assert!(matches!(
            ensure_deliverable(OrderStatus::Delivered),
            Err(CoreError::AlreadyDelivered)
        ));
        assert_eq!(CoreError::AlreadyDelivered.code(), "INVALID_STATUS_TRANSITION");
        assert!(ensure_partial_cancellable(OrderStatus::PartiallyDelivered).is_ok());
        assert!(ensure_partial_cancellable(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_status_after_delivery() {
        let items = vec![
            item(1, OrderItemStatus::Delivered),
            item(2, OrderItemStatus::NotDelivered),
        ];
        assert_eq!(status_after_delivery(&items), OrderStatus::PartiallyDelivered);

        let items = vec![
            item(1, OrderItemStatus::Delivered),
            item(2, OrderItemStatus::Delivered),
        ];
        assert_eq!(status_after_delivery(&items), OrderStatus::Delivered);
    }

    #[test]
    fn test_partial_cancel_refund_is_capped() {
        let refund = partial_cancel_refund(
            &[(3, 0, Money::from_paise(5000)), (1, 0, Money::from_paise(2000))],
            Money::from_paise(10000),
        );
        assert_eq!(refund.paise(), 10000);
    }

    #[test]
    fn test_free_units() {
        let mut a = item(1, OrderItemStatus::NotDelivered);
        a.free_quantity = 2;
        let mut b = item(2, OrderItemStatus::NotDelivered);
        b.free_quantity = 1;
        assert_eq!(free_units(&[&a, &b]), 3);
    }
}
