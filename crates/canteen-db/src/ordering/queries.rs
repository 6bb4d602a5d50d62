//! Read-only order views.

use tracing::debug;

use super::{load_details, OrderDetails, OrderResult, OrderingService, StaffActor};
use crate::repository::{OrderRepository, UserRepository};
use canteen_core::validation::validate_id;
use canteen_core::CoreError;

impl OrderingService {
    /// The customer's PENDING orders, newest first.
    pub async fn ongoing_orders(&self, user_id: i64) -> OrderResult<Vec<OrderDetails>> {
        self.customer_orders(user_id, true).await
    }

    /// The customer's closed orders (every status but PENDING), newest first.
    pub async fn order_history(&self, user_id: i64) -> OrderResult<Vec<OrderDetails>> {
        self.customer_orders(user_id, false).await
    }

    async fn customer_orders(&self, user_id: i64, pending: bool) -> OrderResult<Vec<OrderDetails>> {
        let mut conn = self.db().pool().acquire().await?;

        let customer = UserRepository::new(&mut conn)
            .customer_by_user(user_id)
            .await?
            .ok_or(CoreError::CustomerNotFound)?;
        let orders = OrderRepository::new(&mut conn)
            .list_for_customer(customer.id, pending)
            .await?;

        debug!(user_id, pending, count = orders.len(), "Customer orders loaded");
        load_details(&mut conn, orders).await
    }

    /// One order of an outlet, as seen at the counter.
    pub async fn order_for_outlet(&self, actor: StaffActor, outlet_id: i64, order_id: i64) -> OrderResult<OrderDetails> {
        validate_id("outletId", outlet_id)?;
        validate_id("orderId", order_id)?;
        actor.ensure_outlet(outlet_id)?;

        let mut conn = self.db().pool().acquire().await?;
        let order = OrderRepository::new(&mut conn)
            .get_for_outlet(order_id, outlet_id)
            .await?
            .ok_or(CoreError::OrderNotFoundForOutlet { order_id, outlet_id })?;

        load_details(&mut conn, vec![order])
            .await?
            .pop()
            .ok_or(CoreError::OrderNotFound(order_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::test_support::Fixture;
    use crate::ordering::OrderError;
    use canteen_core::{OrderStatus, PaymentMethod};

    #[tokio::test]
    async fn test_ongoing_and_history_split_by_status() {
        let fx = Fixture::new().await;
        let tea = fx.add_product("Tea", 1000, false, 30).await;

        let first = fx
            .service
            .place_order(fx.user.id, fx.input(&[(tea.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();
        let second = fx
            .service
            .place_order(fx.user.id, fx.input(&[(tea.id, 2)], PaymentMethod::Cash))
            .await
            .unwrap();
        let third = fx
            .service
            .place_order(fx.user.id, fx.input(&[(tea.id, 3)], PaymentMethod::Cash))
            .await
            .unwrap();
        fx.service
            .cancel_by_customer(fx.user.id, first.details.order.id)
            .await
            .unwrap();

        let ongoing = fx.service.ongoing_orders(fx.user.id).await.unwrap();
        let ids: Vec<i64> = ongoing.iter().map(|d| d.order.id).collect();
        assert_eq!(ids, vec![third.details.order.id, second.details.order.id]);
        assert_eq!(ongoing[0].items.len(), 1);
        assert_eq!(ongoing[0].items[0].product_name, "Tea");
        assert_eq!(ongoing[0].outlet.id, fx.outlet.id);

        let history = fx.service.order_history(fx.user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_order_for_outlet_checks_ownership() {
        let fx = Fixture::new().await;
        let tea = fx.add_product("Tea", 1000, false, 30).await;
        let placed = fx
            .service
            .place_order(fx.user.id, fx.input(&[(tea.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();
        let order_id = placed.details.order.id;

        let details = fx
            .service
            .order_for_outlet(fx.staff_actor(), fx.outlet.id, order_id)
            .await
            .unwrap();
        assert_eq!(details.order.id, order_id);

        let err = fx
            .service
            .order_for_outlet(fx.staff_actor(), fx.outlet.id + 1, order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::OutletForbidden { .. })));
    }
}
