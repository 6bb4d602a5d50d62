//! Walk-in orders keyed in at the counter.
//!
//! Paid on the spot and handed over immediately, so they are written as
//! MANUAL + DELIVERED with every item DELIVERED. No customer, no quota, no
//! coupon. Stock goes through the same validate-all / mutate-all path as
//! app orders.

use chrono::Utc;
use tracing::info;

use super::{load_details, stock, OrderDetails, OrderResult, OrderingService, StaffActor};
use crate::repository::order::{NewOrder, NewOrderItem};
use crate::repository::{OrderRepository, OutletRepository, ProductRepository};
use canteen_core::validation::{validate_id, validate_order_lines};
use canteen_core::{
    CoreError, LineItem, Money, OrderItemStatus, OrderStatus, OrderType, PaymentMethod, ValidationError,
};

/// A counter sale.
#[derive(Debug, Clone)]
pub struct ManualOrderInput {
    pub outlet_id: i64,
    /// CASH, UPI or CARD, already collected.
    pub payment_method: PaymentMethod,
    pub items: Vec<LineItem>,
}

impl OrderingService {
    /// Records a walk-in sale priced from the current product prices.
    pub async fn add_manual_order(&self, actor: StaffActor, input: ManualOrderInput) -> OrderResult<OrderDetails> {
        validate_id("outletId", input.outlet_id)?;
        validate_order_lines(&input.items)?;
        if input.payment_method == PaymentMethod::Wallet {
            return Err(ValidationError::NotAllowed {
                field: "paymentMethod".to_string(),
                allowed: [PaymentMethod::Cash, PaymentMethod::Upi, PaymentMethod::Card]
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }
            .into());
        }
        actor.ensure_outlet(input.outlet_id)?;

        let now = Utc::now();
        let mut tx = self.db().begin().await?;

        let outlet = OutletRepository::new(&mut tx)
            .get_by_id(input.outlet_id)
            .await?
            .ok_or(CoreError::OutletNotFound(input.outlet_id))?;

        let product_ids: Vec<i64> = input.items.iter().map(|l| l.product_id).collect();
        let products = ProductRepository::new(&mut tx).get_many(&product_ids).await?;

        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(CoreError::ProductNotFound(line.product_id))?;
            if product.outlet_id != outlet.id {
                return Err(CoreError::ProductWrongOutlet {
                    product_id: product.id,
                    outlet_id: outlet.id,
                }
                .into());
            }
            lines.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price: product.price(),
                free_quantity: 0,
                status: OrderItemStatus::Delivered,
            });
        }
        let total: Money = lines.iter().map(|l| l.unit_price * l.quantity).sum();

        stock::deduct_all(&mut tx, outlet.id, &input.items).await?;

        let order = OrderRepository::new(&mut tx)
            .insert(&NewOrder {
                customer_id: None,
                outlet_id: outlet.id,
                total_amount: total,
                coupon_discount: Money::zero(),
                payment_method: input.payment_method,
                status: OrderStatus::Delivered,
                order_type: OrderType::Manual,
                delivery_date: Some(self.business_day(now)),
                delivery_slot: None,
                is_pre_order: false,
                razorpay_payment_id: None,
                delivered_at: Some(now),
            })
            .await?;

        for line in &lines {
            OrderRepository::new(&mut tx).insert_item(order.id, line).await?;
        }

        let order_id = order.id;
        let details = load_details(&mut tx, vec![order])
            .await?
            .pop()
            .ok_or(CoreError::OrderNotFound(order_id))?;

        tx.commit().await?;

        info!(
            order_id,
            staff_id = actor.user_id,
            outlet_id = outlet.id,
            total = %total,
            method = %input.payment_method,
            "Manual order recorded"
        );
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::test_support::Fixture;
    use crate::ordering::OrderError;
    use canteen_core::StockAction;

    fn walk_in(fx: &Fixture, lines: &[(i64, i64)], method: PaymentMethod) -> ManualOrderInput {
        ManualOrderInput {
            outlet_id: fx.outlet.id,
            payment_method: method,
            items: lines
                .iter()
                .map(|&(product_id, quantity)| LineItem { product_id, quantity })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_manual_order_is_delivered_and_deducts_stock() {
        let fx = Fixture::new().await;
        let tea = fx.add_product("Tea", 1000, false, 30).await;
        let thali = fx.add_product("Thali", 5000, true, 10).await;

        let details = fx
            .service
            .add_manual_order(fx.staff_actor(), walk_in(&fx, &[(tea.id, 3), (thali.id, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        let order = &details.order;
        assert_eq!(order.order_type, OrderType::Manual);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.customer_id.is_none());
        assert!(order.delivered_at.is_some());
        // company-paid units are charged at full price without a customer
        assert_eq!(order.total_amount_paise, 8000);
        assert!(details.items.iter().all(|i| i.status == OrderItemStatus::Delivered));
        assert!(details.items.iter().all(|i| i.free_quantity == 0));

        assert_eq!(fx.stock(tea.id).await, 27);
        assert_eq!(fx.stock_history(tea.id).await.last().map(|h| h.action), Some(StockAction::Remove));
        assert_eq!(fx.quota_used().await, 0);
    }

    #[tokio::test]
    async fn test_manual_order_rejects_wallet_and_short_stock() {
        let fx = Fixture::new().await;
        let tea = fx.add_product("Tea", 1000, false, 2).await;

        let err = fx
            .service
            .add_manual_order(fx.staff_actor(), walk_in(&fx, &[(tea.id, 1)], PaymentMethod::Wallet))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::Validation(_))));

        let err = fx
            .service
            .add_manual_order(fx.staff_actor(), walk_in(&fx, &[(tea.id, 5)], PaymentMethod::Upi))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::StockValidationFailed(_))));
        assert_eq!(fx.stock(tea.id).await, 2);
        assert_eq!(fx.order_count().await, 0);
    }
}
