//! Request and response bodies.
//!
//! Field names are camelCase on the wire; amounts are paise integers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use canteen_core::inventory::StockChange;
use canteen_core::payment::GatewayDetails;
use canteen_core::pricing::{OrderTotals, PricingBreakdown};
use canteen_core::{
    DeliverySlot, Feedback, LineItem, Money, Order, OrderItemStatus, OrderStatus, OrderType, PaymentMethod,
    WalletTransaction, WalletTransactionStatus,
};
use canteen_db::repository::order::OrderItemWithProduct;
use canteen_db::{CancelOutcome, FeedbackItem, OrderDetails, PlacedOrder, UpdateOutcome};

// =============================================================================
// Requests
// =============================================================================

/// One requested line. `unitPrice` is accepted and ignored; prices come
/// from the product rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<Money>,
}

impl From<&OrderLineRequest> for LineItem {
    fn from(line: &OrderLineRequest) -> Self {
        LineItem {
            product_id: line.product_id,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Client-side total, compared against the server total for logging only.
    #[serde(default)]
    pub total_amount: Option<Money>,
    pub payment_method: PaymentMethod,
    pub delivery_slot: DeliverySlot,
    pub outlet_id: i64,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub requested_delivery_date: Option<NaiveDate>,
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub payment_details: Option<GatewayDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponRequest {
    pub code: String,
    pub current_total: Money,
    pub outlet_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
}

impl From<VerifyPaymentRequest> for GatewayDetails {
    fn from(req: VerifyPaymentRequest) -> Self {
        GatewayDetails {
            razorpay_order_id: req.razorpay_order_id,
            razorpay_payment_id: req.razorpay_payment_id,
            razorpay_signature: req.razorpay_signature,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub order_id: i64,
    pub items: Vec<FeedbackItem>,
}

/// `status` stays a string so an unknown value maps to VALIDATION_ERROR
/// instead of a body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub order_id: i64,
    pub outlet_id: i64,
    pub status: String,
    #[serde(default)]
    pub order_item_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderRequest {
    pub outlet_id: i64,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderLineRequest>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutletView {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub free_quantity: i64,
    pub status: OrderItemStatus,
}

impl From<OrderItemWithProduct> for OrderItemView {
    fn from(item: OrderItemWithProduct) -> Self {
        OrderItemView {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: Money::from_paise(item.unit_price_paise),
            free_quantity: item.free_quantity,
            status: item.status,
        }
    }
}

/// An order with its lines.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    pub coupon_discount: Money,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_slot: Option<DeliverySlot>,
    pub is_pre_order: bool,
    pub razorpay_payment_id: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub outlet: OutletView,
    pub items: Vec<OrderItemView>,
}

impl From<OrderDetails> for OrderView {
    fn from(details: OrderDetails) -> Self {
        let OrderDetails { order, items, outlet } = details;
        OrderView {
            id: order.id,
            order_number: order.order_number(),
            status: order.status,
            order_type: order.order_type,
            payment_method: order.payment_method,
            total_amount: order.total_amount(),
            coupon_discount: Money::from_paise(order.coupon_discount_paise),
            delivery_date: order.delivery_date,
            delivery_slot: order.delivery_slot,
            is_pre_order: order.is_pre_order,
            razorpay_payment_id: order.razorpay_payment_id,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
            outlet: OutletView {
                id: outlet.id,
                name: outlet.name,
            },
            items: items.into_iter().map(OrderItemView::from).collect(),
        }
    }
}

/// Order header after a status change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderStatusView {
    fn from(order: &Order) -> Self {
        OrderStatusView {
            id: order.id,
            order_number: order.order_number(),
            status: order.status,
            total_amount: order.total_amount(),
            delivered_at: order.delivered_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransactionView {
    pub id: i64,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: WalletTransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for WalletTransactionView {
    fn from(txn: WalletTransaction) -> Self {
        WalletTransactionView {
            id: txn.id,
            amount: Money::from_paise(txn.amount_paise),
            method: txn.method,
            status: txn.status,
            description: txn.description,
            created_at: txn.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingView {
    #[serde(flatten)]
    pub breakdown: PricingBreakdown,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order: OrderView,
    pub pricing: PricingView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_transaction: Option<WalletTransactionView>,
    pub stock_updates: Vec<StockChange>,
    pub quota: canteen_core::quota::QuotaStatus,
}

impl From<PlacedOrder> for PlaceOrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        PlaceOrderResponse {
            message: "Order placed successfully",
            order: placed.details.into(),
            pricing: PricingView {
                breakdown: placed.breakdown,
                totals: placed.totals,
            },
            wallet_transaction: placed.wallet_transaction.map(Into::into),
            stock_updates: placed.stock_updates,
            quota: placed.quota,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
}

impl From<Vec<OrderDetails>> for OrderListResponse {
    fn from(orders: Vec<OrderDetails>) -> Self {
        OrderListResponse {
            orders: orders.into_iter().map(OrderView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub message: &'static str,
    pub order: OrderStatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Money>,
    pub restocked_units: i64,
    pub quota_restored: i64,
    pub coupons_reversed: usize,
}

impl From<CancelOutcome> for CancelOrderResponse {
    fn from(outcome: CancelOutcome) -> Self {
        CancelOrderResponse {
            message: "Order cancelled successfully",
            order: OrderStatusView::from(&outcome.order),
            refund_amount: outcome.refund.map(|t| Money::from_paise(t.amount_paise)),
            restocked_units: outcome.restocked_units,
            quota_restored: outcome.quota_restored,
            coupons_reversed: outcome.coupons_reversed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderResponse {
    pub message: String,
    pub order: OrderStatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Money>,
}

impl From<UpdateOutcome> for UpdateOrderResponse {
    fn from(outcome: UpdateOutcome) -> Self {
        UpdateOrderResponse {
            order: OrderStatusView::from(&outcome.order),
            message: outcome.message,
            refund_amount: outcome.refunded,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPreviewResponse {
    pub message: &'static str,
    pub code: String,
    pub discount: Money,
    pub total_after_discount: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayKeyResponse {
    pub key_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: i64,
    pub product_id: i64,
    pub rating_overall: f64,
    pub rating_taste: f64,
    pub rating_quality: f64,
    pub rating_quantity: f64,
    pub comment: Option<String>,
}

impl From<Feedback> for FeedbackView {
    fn from(f: Feedback) -> Self {
        FeedbackView {
            id: f.id,
            product_id: f.product_id,
            rating_overall: f.rating_overall,
            rating_taste: f.rating_taste,
            rating_quality: f.rating_quality,
            rating_quantity: f.rating_quantity,
            comment: f.comment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub message: &'static str,
    pub feedback: Vec<FeedbackView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_place_order_request_accepts_gateway_aliases() {
        let req: PlaceOrderRequest = serde_json::from_value(json!({
            "totalAmount": 10000,
            "paymentMethod": "UPI",
            "deliverySlot": "SLOT_12_13",
            "outletId": 1,
            "items": [{ "productId": 3, "quantity": 2, "unitPrice": 5000 }],
            "paymentDetails": {
                "gatewayOrderId": "order_1",
                "gatewayPaymentId": "pay_1",
                "gatewaySignature": "sig"
            }
        }))
        .unwrap();

        assert_eq!(req.payment_method, PaymentMethod::Upi);
        assert_eq!(req.delivery_slot, DeliverySlot::Slot12To13);
        assert_eq!(req.total_amount, Some(Money::from_paise(10000)));
        assert!(req.requested_delivery_date.is_none());
        let details = req.payment_details.unwrap();
        assert_eq!(details.razorpay_payment_id, "pay_1");
        assert_eq!(LineItem::from(&req.items[0]), LineItem { product_id: 3, quantity: 2 });
    }

    #[test]
    fn test_place_order_request_parses_delivery_date() {
        let req: PlaceOrderRequest = serde_json::from_value(json!({
            "paymentMethod": "CASH",
            "deliverySlot": "SLOT_11_12",
            "outletId": 1,
            "requestedDeliveryDate": "2026-03-02",
            "items": []
        }))
        .unwrap();
        assert_eq!(req.requested_delivery_date, NaiveDate::from_ymd_opt(2026, 3, 2));
    }

    #[test]
    fn test_update_order_request_keeps_raw_status() {
        let req: UpdateOrderRequest = serde_json::from_value(json!({
            "orderId": 4,
            "outletId": 1,
            "status": "SHIPPED"
        }))
        .unwrap();
        assert_eq!(req.status, "SHIPPED");
        assert!(req.order_item_ids.is_none());
    }
}
