//! # Cancellation
//!
//! Customer self-cancel and the staff CANCELLED action. Both undo every
//! allowance the order consumed.
//!
//! ## Reversal Table
//! ```text
//! ┌──────────────────────┬─────────────────────────┬─────────────────────────┐
//! │  Ledger              │  customer cancel        │  staff CANCELLED        │
//! ├──────────────────────┼─────────────────────────┼─────────────────────────┤
//! │  order status        │  PENDING → CANCELLED    │  PENDING → CANCELLED    │
//! │  inventory           │  + qty, ADD history     │  + qty, ADD history     │
//! │  wallet              │  WALLET orders: CREDIT  │  APP+WALLET: RECHARGE   │
//! │                      │  (wallet must exist)    │  (skipped if no wallet) │
//! │  coupon usage        │  row deleted, used - 1  │  row deleted, used - 1  │
//! │  free quota          │  - Σ free_quantity      │  - Σ free_quantity      │
//! └──────────────────────┴─────────────────────────┴─────────────────────────┘
//! ```
//!
//! Quota is given back to the business day the order was placed on, and
//! only when that row still holds at least the units being returned.

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::settlement::{self, Refund};
use super::{stock, OrderResult, OrderingService};
use crate::repository::{CouponRepository, OrderRepository, QuotaRepository, UserRepository};
use canteen_core::order::{ensure_customer_cancellable, ensure_staff_cancellable, free_units};
use canteen_core::validation::validate_id;
use canteen_core::{
    CoreError, LineItem, Order, OrderItem, OrderStatus, OrderType, PaymentMethod, WalletTransaction,
    WalletTransactionStatus,
};

/// What a cancellation changed.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub order: Order,
    pub refund: Option<WalletTransaction>,
    pub restocked_units: i64,
    pub quota_restored: i64,
    pub coupons_reversed: usize,
}

impl OrderingService {
    /// Cancels a PENDING order on behalf of the customer who placed it.
    pub async fn cancel_by_customer(&self, user_id: i64, order_id: i64) -> OrderResult<CancelOutcome> {
        validate_id("orderId", order_id)?;
        info!(user_id, order_id, "Customer cancelling order");

        let mut tx = self.db().begin().await?;

        let customer = UserRepository::new(&mut tx)
            .customer_by_user(user_id)
            .await?
            .ok_or(CoreError::CustomerNotFound)?;
        let order = OrderRepository::new(&mut tx)
            .get_for_customer(order_id, customer.id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;
        ensure_customer_cancellable(order.status)?;

        let refund = if order.payment_method == PaymentMethod::Wallet {
            let description = format!("Refund for order {}", order.order_number());
            settlement::refund(
                &mut tx,
                Refund {
                    customer_id: customer.id,
                    amount: order.total_amount(),
                    method: PaymentMethod::Wallet,
                    status: WalletTransactionStatus::Credit,
                    description: &description,
                    wallet_required: true,
                },
            )
            .await?
        } else {
            None
        };

        let outcome = self.cancel_pending(&mut tx, order, Some(user_id), refund).await?;
        tx.commit().await?;

        info!(
            order_id,
            user_id,
            restocked = outcome.restocked_units,
            quota_restored = outcome.quota_restored,
            refunded = outcome.refund.is_some(),
            "Order cancelled by customer"
        );
        Ok(outcome)
    }

    /// The staff CANCELLED action. Runs inside the caller's transaction.
    pub(super) async fn cancel_for_staff(&self, conn: &mut SqliteConnection, order: Order) -> OrderResult<CancelOutcome> {
        ensure_staff_cancellable(order.status)?;

        let customer = match order.customer_id {
            Some(customer_id) => UserRepository::new(conn).customer_by_id(customer_id).await?,
            None => None,
        };

        let refund = match &customer {
            Some(customer) if order.order_type == OrderType::App && order.payment_method == PaymentMethod::Wallet => {
                let description = format!("Refund for cancelled order {}", order.order_number());
                settlement::refund(
                    conn,
                    Refund {
                        customer_id: customer.id,
                        amount: order.total_amount(),
                        method: order.payment_method,
                        status: WalletTransactionStatus::Recharge,
                        description: &description,
                        wallet_required: false,
                    },
                )
                .await?
            }
            _ => None,
        };

        self.cancel_pending(conn, order, customer.map(|c| c.user_id), refund).await
    }

    /// Shared tail of both cancellations: status, stock, coupon, quota.
    async fn cancel_pending(
        &self,
        conn: &mut SqliteConnection,
        order: Order,
        quota_owner: Option<i64>,
        refund: Option<WalletTransaction>,
    ) -> OrderResult<CancelOutcome> {
        if !OrderRepository::new(conn)
            .transition(order.id, OrderStatus::Pending, OrderStatus::Cancelled, None)
            .await?
        {
            return Err(CoreError::ConcurrentUpdate { entity: "order" }.into());
        }

        let items = OrderRepository::new(conn).items(order.id).await?;
        let restocked_units = stock::restock_all(conn, order.outlet_id, &line_items(&items)).await?;

        let coupons_reversed = reverse_coupons(conn, order.id).await?;

        let all: Vec<&OrderItem> = items.iter().collect();
        let quota_restored = match quota_owner {
            Some(user_id) => self.give_back_quota(conn, user_id, &order, free_units(&all)).await?,
            None => 0,
        };

        let order = OrderRepository::new(conn)
            .get_by_id(order.id)
            .await?
            .ok_or(CoreError::OrderNotFound(order.id))?;

        Ok(CancelOutcome {
            order,
            refund,
            restocked_units,
            quota_restored,
            coupons_reversed,
        })
    }

    /// Returns free units to the quota row of the day the order was placed.
    ///
    /// Returns how many units were restored (0 when the row holds fewer).
    pub(super) async fn give_back_quota(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        order: &Order,
        units: i64,
    ) -> OrderResult<i64> {
        if units <= 0 {
            return Ok(0);
        }

        let day = self.business_day(order.created_at);
        if QuotaRepository::new(conn).restore(user_id, day, units).await? {
            debug!(user_id, order_id = order.id, %day, units, "Quota restored");
            Ok(units)
        } else {
            warn!(user_id, order_id = order.id, %day, units, "Quota row holds fewer units; not restored");
            Ok(0)
        }
    }
}

/// Deletes the order's coupon usages and frees their slots.
async fn reverse_coupons(conn: &mut SqliteConnection, order_id: i64) -> OrderResult<usize> {
    let mut coupons = CouponRepository::new(conn);
    let usages = coupons.usages_for_order(order_id).await?;
    for usage in &usages {
        coupons.reverse_usage(usage).await?;
    }
    Ok(usages.len())
}

pub(super) fn line_items<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|i| LineItem {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::test_support::Fixture;
    use crate::ordering::{OrderError, UpdateOrderInput};
    use canteen_core::coupon::CouponReward;
    use canteen_core::order::StaffAction;
    use canteen_core::{Money, StockAction};

    #[tokio::test]
    async fn test_customer_cancel_refunds_wallet_and_restocks() {
        let fx = Fixture::new().await;
        let meal = fx.add_product("Meal", 15000, false, 10).await;
        fx.fund_wallet(30000).await;

        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(meal.id, 2)], PaymentMethod::Wallet))
            .await
            .unwrap();
        assert_eq!(fx.wallet().await.unwrap().balance_paise, 0);
        assert_eq!(fx.stock(meal.id).await, 8);

        let outcome = fx
            .service
            .cancel_by_customer(fx.user.id, placed.details.order.id)
            .await
            .unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.restocked_units, 2);
        let refund = outcome.refund.unwrap();
        assert_eq!(refund.amount_paise, 30000);
        assert_eq!(refund.status, WalletTransactionStatus::Credit);
        assert_eq!(
            refund.description.as_deref(),
            Some(format!("Refund for order {}", placed.details.order.order_number()).as_str())
        );

        assert_eq!(fx.wallet().await.unwrap().balance_paise, 30000);
        assert_eq!(fx.stock(meal.id).await, 10);

        let history = fx.stock_history(meal.id).await;
        assert_eq!(history.last().map(|h| h.action), Some(StockAction::Add));

        let statuses: Vec<_> = fx.wallet_transactions().await.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![WalletTransactionStatus::Deduct, WalletTransactionStatus::Credit]
        );
    }

    #[tokio::test]
    async fn test_customer_cancel_gives_back_quota_and_coupon() {
        let fx = Fixture::new().await;
        let thali = fx.add_product("Thali", 5000, true, 20).await;
        let coupon = fx.add_coupon("WELCOME", CouponReward::Fixed(Money::from_paise(1000)), 0).await;

        let mut input = fx.input(&[(thali.id, 7)], PaymentMethod::Cash);
        input.coupon_code = Some("WELCOME".to_string());
        let placed = fx.service.place_order(fx.user.id, input.clone()).await.unwrap();
        assert_eq!(fx.quota_used().await, 5);
        assert_eq!(fx.coupon_used_count(coupon.id).await, 1);

        let outcome = fx
            .service
            .cancel_by_customer(fx.user.id, placed.details.order.id)
            .await
            .unwrap();

        assert_eq!(outcome.quota_restored, 5);
        assert_eq!(outcome.coupons_reversed, 1);
        assert!(outcome.refund.is_none());
        assert_eq!(fx.quota_used().await, 0);
        assert_eq!(fx.coupon_used_count(coupon.id).await, 0);
        assert!(!fx.coupon_usage_exists(coupon.id).await);

        // The same coupon is usable again.
        fx.service.place_order(fx.user.id, input).await.unwrap();
        assert_eq!(fx.coupon_used_count(coupon.id).await, 1);
    }

    #[tokio::test]
    async fn test_customer_cannot_cancel_twice() {
        let fx = Fixture::new().await;
        let meal = fx.add_product("Meal", 15000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(meal.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        fx.service
            .cancel_by_customer(fx.user.id, placed.details.order.id)
            .await
            .unwrap();
        let err = fx
            .service
            .cancel_by_customer(fx.user.id, placed.details.order.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::Core(CoreError::OrderNotCancellable {
                status: OrderStatus::Cancelled
            })
        ));
        assert_eq!(fx.stock(meal.id).await, 10);
    }

    #[tokio::test]
    async fn test_customer_cannot_cancel_someone_elses_order() {
        let fx = Fixture::new().await;
        let meal = fx.add_product("Meal", 15000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(meal.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let mut users = UserRepository::new(&mut conn);
        let other = users
            .insert("ravi@example.com", "Ravi", canteen_core::Role::Customer, None)
            .await
            .unwrap();
        users.insert_customer(other.id).await.unwrap();
        drop(conn);

        let err = fx
            .service
            .cancel_by_customer(other.id, placed.details.order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::OrderNotFound(_))));
        assert_eq!(fx.order(placed.details.order.id).await.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_staff_cancel_reverses_everything() {
        let fx = Fixture::new().await;
        let thali = fx.add_product("Thali", 5000, true, 20).await;
        let coupon = fx.add_coupon("STAFFX", CouponReward::Fixed(Money::from_paise(1000)), 0).await;
        fx.fund_wallet(50000).await;

        let mut input = fx.input(&[(thali.id, 6)], PaymentMethod::Wallet);
        input.coupon_code = Some("STAFFX".to_string());
        let placed = fx.service.place_order(fx.user.id, input).await.unwrap();
        // 5 free, 1 charged ₹50, minus ₹10 coupon
        assert_eq!(placed.totals.final_total.paise(), 4000);

        let outcome = fx
            .service
            .update_order(
                fx.staff_actor(),
                UpdateOrderInput {
                    order_id: placed.details.order.id,
                    outlet_id: fx.outlet.id,
                    status: StaffAction::Cancelled,
                    order_item_ids: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.message, "Order cancelled and stock updated");
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.refunded.map(|m| m.paise()), Some(4000));
        assert_eq!(fx.wallet().await.unwrap().balance_paise, 50000);
        assert_eq!(fx.stock(thali.id).await, 20);
        assert_eq!(fx.quota_used().await, 0);
        assert_eq!(fx.coupon_used_count(coupon.id).await, 0);

        let last = fx.wallet_transactions().await.pop().unwrap();
        assert_eq!(last.status, WalletTransactionStatus::Recharge);
    }

    #[tokio::test]
    async fn test_staff_cancel_only_from_pending() {
        let fx = Fixture::new().await;
        let meal = fx.add_product("Meal", 15000, false, 10).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(meal.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();
        let order_id = placed.details.order.id;

        let update = |status| UpdateOrderInput {
            order_id,
            outlet_id: fx.outlet.id,
            status,
            order_item_ids: Vec::new(),
        };
        fx.service
            .update_order(fx.staff_actor(), update(StaffAction::Delivered))
            .await
            .unwrap();

        let err = fx
            .service
            .update_order(fx.staff_actor(), update(StaffAction::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::CannotCancel { .. })));
        assert_eq!(fx.stock(meal.id).await, 9);
    }
}
