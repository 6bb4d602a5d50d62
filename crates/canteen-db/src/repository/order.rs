//! # Order Repository
//!
//! Orders and their lines.
//!
//! ## Status Writes
//! Status changes are conditional on the status the caller read:
//!
//! ```text
//! UPDATE orders SET status = 'CANCELLED' WHERE id = ? AND status = 'PENDING'
//!                                                     └── 0 rows: someone else
//!                                                         moved the order first
//! ```
//!
//! Two staff members cancelling the same order therefore cannot both
//! restock it and both refund it.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use super::placeholders;
use crate::error::DbResult;
use canteen_core::{
    DeliverySlot, Money, Order, OrderItem, OrderItemStatus, OrderStatus, OrderType, PaymentMethod,
};

const ORDER_COLUMNS: &str = "id, customer_id, outlet_id, total_amount_paise, coupon_discount_paise, \
     payment_method, status, order_type, delivery_date, delivery_slot, is_pre_order, \
     razorpay_payment_id, delivered_at, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price_paise, free_quantity, status, created_at";

// =============================================================================
// Row Types
// =============================================================================

/// Fields needed to create an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Option<i64>,
    pub outlet_id: i64,
    pub total_amount: Money,
    pub coupon_discount: Money,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_slot: Option<DeliverySlot>,
    pub is_pre_order: bool,
    pub razorpay_payment_id: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Fields needed to create an order line.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub free_quantity: i64,
    pub status: OrderItemStatus,
}

/// An order line joined with the product it refers to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemWithProduct {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub free_quantity: i64,
    pub status: OrderItemStatus,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_price_paise: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and order items.
pub struct OrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OrderRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OrderRepository { conn }
    }

    /// Inserts an order row.
    pub async fn insert(&mut self, order: &NewOrder) -> DbResult<Order> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO orders
                (customer_id, outlet_id, total_amount_paise, coupon_discount_paise, payment_method, status,
                 order_type, delivery_date, delivery_slot, is_pre_order, razorpay_payment_id, delivered_at,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(order.customer_id)
            .bind(order.outlet_id)
            .bind(order.total_amount.paise())
            .bind(order.coupon_discount.paise())
            .bind(order.payment_method)
            .bind(order.status)
            .bind(order.order_type)
            .bind(order.delivery_date)
            .bind(order.delivery_slot)
            .bind(order.is_pre_order)
            .bind(order.razorpay_payment_id.as_deref())
            .bind(order.delivered_at)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.conn)
            .await?;

        debug!(order_id = row.id, outlet_id = row.outlet_id, total = %order.total_amount, "Order inserted");
        Ok(row)
    }

    /// Inserts one order line.
    pub async fn insert_item(&mut self, order_id: i64, item: &NewOrderItem) -> DbResult<OrderItem> {
        let sql = format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price_paise, free_quantity, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price.paise())
            .bind(item.free_quantity)
            .bind(item.status)
            .bind(Utc::now())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(order)
    }

    /// Gets an order only if it belongs to the customer.
    pub async fn get_for_customer(&mut self, id: i64, customer_id: i64) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? AND customer_id = ?");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(order)
    }

    /// Gets an order only if it belongs to the outlet.
    pub async fn get_for_outlet(&mut self, id: i64, outlet_id: i64) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? AND outlet_id = ?");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(outlet_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(order)
    }

    /// Lines of an order in insertion order.
    pub async fn items(&mut self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id");
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(items)
    }

    /// Lines of several orders joined with their products.
    pub async fn items_with_products(&mut self, order_ids: &[i64]) -> DbResult<Vec<OrderItemWithProduct>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.unit_price_paise, oi.free_quantity,
                   oi.status, p.name AS product_name, p.description AS product_description,
                   p.price_paise AS product_price_paise
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id IN ({})
            ORDER BY oi.order_id, oi.id
            "#,
            placeholders(order_ids.len())
        );
        let mut query = sqlx::query_as::<_, OrderItemWithProduct>(&sql);
        for id in order_ids {
            query = query.bind(*id);
        }

        Ok(query.fetch_all(&mut *self.conn).await?)
    }

    /// Customer orders, newest first. `pending` selects PENDING orders;
    /// otherwise every other status is returned.
    pub async fn list_for_customer(&mut self, customer_id: i64, pending: bool) -> DbResult<Vec<Order>> {
        let op = if pending { "=" } else { "<>" };
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ? AND status {op} 'PENDING' \
             ORDER BY created_at DESC, id DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(orders)
    }

    /// Moves an order from `from` to `to`.
    ///
    /// Returns `false` when the order is no longer in `from`.
    pub async fn transition(
        &mut self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, delivered_at = COALESCE(?, delivered_at), updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(delivered_at)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .execute(&mut *self.conn)
        .await?;

        debug!(order_id = id, %from, %to, applied = result.rows_affected() == 1, "Order status transition");
        Ok(result.rows_affected() == 1)
    }

    /// Marks the listed lines DELIVERED. Returns how many changed.
    pub async fn mark_items_delivered(&mut self, order_id: i64, item_ids: &[i64]) -> DbResult<u64> {
        if item_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE order_items SET status = ? WHERE order_id = ? AND status = ? AND id IN ({})",
            placeholders(item_ids.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(OrderItemStatus::Delivered)
            .bind(order_id)
            .bind(OrderItemStatus::NotDelivered);
        for id in item_ids {
            query = query.bind(*id);
        }

        Ok(query.execute(&mut *self.conn).await?.rows_affected())
    }
}
