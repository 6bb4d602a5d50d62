//! # Staff Order Updates
//!
//! The update-order endpoint: CANCELLED, DELIVERED, PARTIALLY_DELIVERED and
//! PARTIAL_CANCEL, each in its own transaction.
//!
//! ## Outcomes
//! ```text
//! ┌──────────────────────┬──────────────────────────────┬──────────────────┐
//! │  Action              │  Items                       │  Order ends as   │
//! ├──────────────────────┼──────────────────────────────┼──────────────────┤
//! │  CANCELLED           │  restocked                   │  CANCELLED       │
//! │  DELIVERED           │  all → DELIVERED             │  DELIVERED       │
//! │  PARTIALLY_DELIVERED │  listed → DELIVERED          │  PARTIALLY_ or   │
//! │                      │                              │  DELIVERED       │
//! │  PARTIAL_CANCEL      │  undelivered restocked,      │  DELIVERED       │
//! │                      │  refunded, quota returned    │  (closed)        │
//! └──────────────────────┴──────────────────────────────┴──────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use super::cancellation::line_items;
use super::settlement::{self, Refund};
use super::{stock, OrderResult, OrderingService, StaffActor};
use crate::repository::{OrderRepository, UserRepository};
use canteen_core::order::{
    ensure_deliverable, ensure_partial_cancellable, free_units, partial_cancel_refund, refunds_to_wallet,
    status_after_delivery, StaffAction,
};
use canteen_core::validation::validate_id;
use canteen_core::{CoreError, Money, Order, OrderItem, OrderStatus, WalletTransactionStatus};

/// A staff status update.
#[derive(Debug, Clone)]
pub struct UpdateOrderInput {
    pub order_id: i64,
    pub outlet_id: i64,
    pub status: StaffAction,
    /// Item ids for PARTIALLY_DELIVERED. Ignored by the other actions.
    pub order_item_ids: Vec<i64>,
}

/// Result of a staff status update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub order: Order,
    pub message: String,
    /// Amount credited to the customer's wallet, if any.
    pub refunded: Option<Money>,
}

impl OrderingService {
    /// Applies a staff status update to an order of the staff member's outlet.
    pub async fn update_order(&self, actor: StaffActor, input: UpdateOrderInput) -> OrderResult<UpdateOutcome> {
        validate_id("orderId", input.order_id)?;
        validate_id("outletId", input.outlet_id)?;
        actor.ensure_outlet(input.outlet_id)?;

        info!(
            staff_id = actor.user_id,
            order_id = input.order_id,
            outlet_id = input.outlet_id,
            action = ?input.status,
            "Updating order"
        );

        let mut tx = self.db().begin().await?;

        let order = OrderRepository::new(&mut tx)
            .get_for_outlet(input.order_id, input.outlet_id)
            .await?
            .ok_or(CoreError::OrderNotFoundForOutlet {
                order_id: input.order_id,
                outlet_id: input.outlet_id,
            })?;

        let outcome = match input.status {
            StaffAction::Cancelled => {
                let cancelled = self.cancel_for_staff(&mut tx, order).await?;
                UpdateOutcome {
                    order: cancelled.order,
                    message: "Order cancelled and stock updated".to_string(),
                    refunded: cancelled.refund.map(|t| Money::from_paise(t.amount_paise)),
                }
            }
            StaffAction::Delivered => deliver_all(&mut tx, order).await?,
            StaffAction::PartiallyDelivered => deliver_some(&mut tx, order, &input.order_item_ids).await?,
            StaffAction::PartialCancel => self.cancel_remainder(&mut tx, order).await?,
        };

        tx.commit().await?;

        info!(
            order_id = outcome.order.id,
            status = %outcome.order.status,
            refunded = outcome.refunded.map(|m| m.paise()).unwrap_or(0),
            "Order updated"
        );
        Ok(outcome)
    }

    /// PARTIAL_CANCEL: closes a partly delivered order, giving back what
    /// was not handed over.
    async fn cancel_remainder(&self, conn: &mut SqliteConnection, order: Order) -> OrderResult<UpdateOutcome> {
        ensure_partial_cancellable(order.status)?;

        let items = OrderRepository::new(conn).items(order.id).await?;
        let undelivered: Vec<&OrderItem> = items.iter().filter(|i| !i.is_delivered()).collect();
        if undelivered.is_empty() {
            return Err(CoreError::NoUndeliveredItems.into());
        }

        let owed: Vec<(i64, i64, Money)> = undelivered
            .iter()
            .map(|i| (i.quantity, i.free_quantity, i.unit_price()))
            .collect();
        let refund_amount = partial_cancel_refund(&owed, order.total_amount());

        transition(conn, &order, OrderStatus::Delivered).await?;
        stock::restock_all(conn, order.outlet_id, &line_items(undelivered.iter().copied())).await?;

        let customer = match order.customer_id {
            Some(customer_id) => UserRepository::new(conn).customer_by_id(customer_id).await?,
            None => None,
        };

        let mut refunded = None;
        if let Some(customer) = &customer {
            if refunds_to_wallet(&order) {
                let description = format!("Refund for undelivered items of order {}", order.order_number());
                refunded = settlement::refund(
                    conn,
                    Refund {
                        customer_id: customer.id,
                        amount: refund_amount,
                        method: order.payment_method,
                        status: WalletTransactionStatus::Recharge,
                        description: &description,
                        wallet_required: false,
                    },
                )
                .await?
                .map(|t| Money::from_paise(t.amount_paise));
            }
            self.give_back_quota(conn, customer.user_id, &order, free_units(&undelivered))
                .await?;
        }

        let order = reload(conn, order.id).await?;
        Ok(UpdateOutcome {
            order,
            message: format!("Undelivered items cancelled, stock restored, and {refund_amount} refunded"),
            refunded,
        })
    }
}

/// DELIVERED: every item and the order itself.
async fn deliver_all(conn: &mut SqliteConnection, order: Order) -> OrderResult<UpdateOutcome> {
    ensure_deliverable(order.status)?;

    let items = OrderRepository::new(conn).items(order.id).await?;
    let pending: Vec<i64> = items.iter().filter(|i| !i.is_delivered()).map(|i| i.id).collect();
    OrderRepository::new(conn).mark_items_delivered(order.id, &pending).await?;

    transition(conn, &order, OrderStatus::Delivered).await?;

    Ok(UpdateOutcome {
        order: reload(conn, order.id).await?,
        message: "All items and order marked DELIVERED".to_string(),
        refunded: None,
    })
}

/// PARTIALLY_DELIVERED: the listed items; promotes to DELIVERED when
/// nothing is left.
async fn deliver_some(conn: &mut SqliteConnection, order: Order, item_ids: &[i64]) -> OrderResult<UpdateOutcome> {
    ensure_deliverable(order.status)?;
    if item_ids.is_empty() {
        return Err(CoreError::NoItemsToDeliver.into());
    }

    let items = OrderRepository::new(conn).items(order.id).await?;
    if let Some(&unknown) = item_ids.iter().find(|id| !items.iter().any(|i| i.id == **id)) {
        return Err(CoreError::OrderItemNotFound {
            order_id: order.id,
            item_id: unknown,
        }
        .into());
    }

    OrderRepository::new(conn).mark_items_delivered(order.id, item_ids).await?;

    let items = OrderRepository::new(conn).items(order.id).await?;
    let next = status_after_delivery(&items);
    transition(conn, &order, next).await?;

    let message = if item_ids.len() == 1 {
        "Order marked PARTIALLY_DELIVERED; one item delivered"
    } else {
        "Selected items delivered, order marked PARTIALLY_DELIVERED"
    };

    Ok(UpdateOutcome {
        order: reload(conn, order.id).await?,
        message: message.to_string(),
        refunded: None,
    })
}

/// Moves the order from the status it was read with, stamping
/// `delivered_at` when it reaches DELIVERED.
async fn transition(conn: &mut SqliteConnection, order: &Order, to: OrderStatus) -> OrderResult<()> {
    let delivered_at = (to == OrderStatus::Delivered).then(Utc::now);
    if !OrderRepository::new(conn)
        .transition(order.id, order.status, to, delivered_at)
        .await?
    {
        return Err(CoreError::ConcurrentUpdate { entity: "order" }.into());
    }
    Ok(())
}

async fn reload(conn: &mut SqliteConnection, order_id: i64) -> OrderResult<Order> {
    let order = OrderRepository::new(conn)
        .get_by_id(order_id)
        .await?
        .ok_or(CoreError::OrderNotFound(order_id))?;
    Ok(order)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::test_support::Fixture;
    use crate::ordering::OrderError;
    use canteen_core::{OrderItemStatus, PaymentMethod, Role};

    fn update(fx: &Fixture, order_id: i64, status: StaffAction, order_item_ids: Vec<i64>) -> UpdateOrderInput {
        UpdateOrderInput {
            order_id,
            outlet_id: fx.outlet.id,
            status,
            order_item_ids,
        }
    }

    #[tokio::test]
    async fn test_deliver_all_marks_items_and_stamps_time() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let b = fx.add_product("Vada", 2000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1), (b.id, 2)], PaymentMethod::Cash))
            .await
            .unwrap();

        let outcome = fx
            .service
            .update_order(
                fx.staff_actor(),
                update(&fx, placed.details.order.id, StaffAction::Delivered, Vec::new()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.message, "All items and order marked DELIVERED");
        assert_eq!(outcome.order.status, OrderStatus::Delivered);
        assert!(outcome.order.delivered_at.is_some());
        assert!(fx
            .order_items(placed.details.order.id)
            .await
            .iter()
            .all(|i| i.status == OrderItemStatus::Delivered));
    }

    #[tokio::test]
    async fn test_partial_delivery_then_promotion() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let b = fx.add_product("Vada", 2000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1), (b.id, 2)], PaymentMethod::Cash))
            .await
            .unwrap();
        let order_id = placed.details.order.id;
        let item_ids: Vec<i64> = placed.details.items.iter().map(|i| i.id).collect();

        let first = fx
            .service
            .update_order(
                fx.staff_actor(),
                update(&fx, order_id, StaffAction::PartiallyDelivered, vec![item_ids[0]]),
            )
            .await
            .unwrap();
        assert_eq!(first.order.status, OrderStatus::PartiallyDelivered);
        assert_eq!(first.message, "Order marked PARTIALLY_DELIVERED; one item delivered");
        assert!(first.order.delivered_at.is_none());

        let second = fx
            .service
            .update_order(
                fx.staff_actor(),
                update(&fx, order_id, StaffAction::PartiallyDelivered, vec![item_ids[1]]),
            )
            .await
            .unwrap();
        assert_eq!(second.order.status, OrderStatus::Delivered);
        assert!(second.order.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_partial_delivery_requires_known_items() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();
        let order_id = placed.details.order.id;

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::PartiallyDelivered, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::NoItemsToDeliver)));

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::PartiallyDelivered, vec![9999]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::OrderItemNotFound { item_id: 9999, .. })
        ));
        assert_eq!(fx.order(order_id).await.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_delivered() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();
        let order_id = placed.details.order.id;
        fx.service.cancel_by_customer(fx.user.id, order_id).await.unwrap();

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::Delivered, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::CannotDeliverCancelled)));
    }

    #[tokio::test]
    async fn test_partial_cancel_refunds_charged_units_only() {
        let fx = Fixture::new().await;
        let thali = fx.add_product("Thali", 5000, true, 20).await;
        let juice = fx.add_product("Juice", 3000, false, 20).await;
        fx.fund_wallet(100000).await;
        fx.set_quota_used(3).await;

        // thali: 4 units, 2 free + 2 charged (₹100); juice: 2 units (₹60)
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(juice.id, 2), (thali.id, 4)], PaymentMethod::Wallet))
            .await
            .unwrap();
        assert_eq!(placed.totals.final_total.paise(), 16000);
        let order_id = placed.details.order.id;
        let juice_item = placed.details.items.iter().find(|i| i.product_id == juice.id).unwrap().id;

        fx.service
            .update_order(
                fx.staff_actor(),
                update(&fx, order_id, StaffAction::PartiallyDelivered, vec![juice_item]),
            )
            .await
            .unwrap();

        let outcome = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::PartialCancel, Vec::new()))
            .await
            .unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Delivered);
        assert_eq!(outcome.refunded.map(|m| m.paise()), Some(10000));
        assert_eq!(
            outcome.message,
            "Undelivered items cancelled, stock restored, and ₹100.00 refunded"
        );
        assert_eq!(fx.wallet().await.unwrap().balance_paise, 100000 - 16000 + 10000);
        assert_eq!(fx.stock(thali.id).await, 20);
        assert_eq!(fx.stock(juice.id).await, 18);
        assert_eq!(fx.quota_used().await, 3);
    }

    #[tokio::test]
    async fn test_order_closed_by_partial_cancel_stays_closed() {
        let fx = Fixture::new().await;
        let dosa = fx.add_product("Dosa", 3000, false, 10).await;
        let tea = fx.add_product("Tea", 2000, false, 10).await;
        let lassi = fx.add_product("Lassi", 5000, false, 10).await;
        fx.fund_wallet(100000).await;

        let placed = fx
            .service
            .place_order(
                fx.user.id,
                fx.input(&[(dosa.id, 1), (tea.id, 1), (lassi.id, 1)], PaymentMethod::Wallet),
            )
            .await
            .unwrap();
        let order_id = placed.details.order.id;
        let item_of = |product_id: i64| {
            placed
                .details
                .items
                .iter()
                .find(|i| i.product_id == product_id)
                .unwrap()
                .id
        };

        fx.service
            .update_order(
                fx.staff_actor(),
                update(&fx, order_id, StaffAction::PartiallyDelivered, vec![item_of(dosa.id)]),
            )
            .await
            .unwrap();
        let closed = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::PartialCancel, Vec::new()))
            .await
            .unwrap();
        assert_eq!(closed.order.status, OrderStatus::Delivered);
        assert_eq!(closed.refunded.map(|m| m.paise()), Some(7000));

        let balance = fx.wallet().await.unwrap().balance_paise;
        assert_eq!(balance, 100000 - 3000);

        let err = fx
            .service
            .update_order(
                fx.staff_actor(),
                update(&fx, order_id, StaffAction::PartiallyDelivered, vec![item_of(tea.id)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::AlreadyDelivered)));

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::Delivered, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::AlreadyDelivered)));

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(&fx, order_id, StaffAction::PartialCancel, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::CannotPartialCancel {
                status: OrderStatus::Delivered
            })
        ));

        // cancelled remainder is neither delivered nor refunded again
        assert_eq!(fx.order(order_id).await.status, OrderStatus::Delivered);
        assert_eq!(fx.wallet().await.unwrap().balance_paise, balance);
        assert_eq!(fx.stock(tea.id).await, 10);
        assert_eq!(fx.stock(lassi.id).await, 10);
        let items = fx.order_items(order_id).await;
        assert_eq!(items.iter().filter(|i| i.is_delivered()).count(), 1);
    }

    #[tokio::test]
    async fn test_partial_cancel_requires_partially_delivered() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        let err = fx
            .service
            .update_order(
                fx.staff_actor(),
                update(&fx, placed.details.order.id, StaffAction::PartialCancel, Vec::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::CannotPartialCancel {
                status: OrderStatus::Pending
            })
        ));
    }

    #[tokio::test]
    async fn test_staff_of_other_outlet_is_forbidden() {
        let fx = Fixture::new().await;
        let a = fx.add_product("Idli", 3000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(a.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        let outsider = StaffActor {
            user_id: 999,
            role: Role::Staff,
            outlet_id: Some(fx.outlet.id + 1),
        };
        let err = fx
            .service
            .update_order(outsider, update(&fx, placed.details.order.id, StaffAction::Delivered, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::OutletForbidden { .. })));

        let wrong_outlet = UpdateOrderInput {
            outlet_id: fx.outlet.id + 1,
            ..update(&fx, placed.details.order.id, StaffAction::Delivered, Vec::new())
        };
        let superadmin = StaffActor {
            user_id: 1,
            role: Role::Superadmin,
            outlet_id: None,
        };
        let err = fx.service.update_order(superadmin, wrong_outlet).await.unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::OrderNotFoundForOutlet { .. })));
    }
}
