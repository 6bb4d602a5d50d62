//! Staff routes driven through the full router.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

const BASE: &str = "/api/staff/outlets";

fn item_id_for(order: &Value, product_id: i64) -> i64 {
    order["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["productId"] == product_id)
        .and_then(|i| i["id"].as_i64())
        .unwrap()
}

#[tokio::test]
async fn test_customer_token_cannot_use_staff_routes() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(Method::GET, &format!("{BASE}/get-order/{}/1", app.outlet.id), None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_deliver_whole_order() {
    let app = TestApp::new().await;
    let thali = app.add_product("Veg Thali", 5000, true, 10).await;
    let placed = app.place_cash_order(&[(thali.id, 2)]).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let response = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": order_id, "outletId": app.outlet.id, "status": "DELIVERED" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["message"], "All items and order marked DELIVERED");
    assert_eq!(response.body["order"]["status"], "DELIVERED");
    assert!(response.body["order"]["deliveredAt"].is_string());

    let again = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": order_id, "outletId": app.outlet.id, "status": "CANCELLED" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_status_is_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": 1, "outletId": app.outlet.id, "status": "SHIPPED" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_staff_limited_to_assigned_outlet() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": 1, "outletId": app.other_outlet.id, "status": "DELIVERED" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_cancel_restocks() {
    let app = TestApp::new().await;
    let tea = app.add_product("Masala Tea", 1000, false, 10).await;
    let placed = app.place_cash_order(&[(tea.id, 4)]).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();
    assert_eq!(app.stock(tea.id).await, 6);

    let response = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": order_id, "outletId": app.outlet.id, "status": "CANCELLED" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["message"], "Order cancelled and stock updated");
    assert!(response.body["refundAmount"].is_null());
    assert_eq!(app.stock(tea.id).await, 10);
}

#[tokio::test]
async fn test_partial_delivery_then_cancel_remainder_refunds_wallet() {
    let app = TestApp::new().await;
    let tea = app.add_product("Masala Tea", 1000, false, 10).await;
    let samosa = app.add_product("Samosa", 1500, false, 10).await;
    app.fund_wallet(10_000).await;

    let placed = app
        .as_customer(
            Method::POST,
            "/api/customer/outlets/customer-order",
            Some(app.order_body(&[(tea.id, 2), (samosa.id, 1)], "WALLET")),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.body);
    let order = &placed.body["order"];
    let order_id = order["id"].as_i64().unwrap();
    let tea_item = item_id_for(order, tea.id);

    let partial = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({
                "orderId": order_id,
                "outletId": app.outlet.id,
                "status": "PARTIALLY_DELIVERED",
                "orderItemIds": [tea_item],
            })),
        )
        .await;
    assert_eq!(partial.status, StatusCode::OK, "{}", partial.body);
    assert_eq!(partial.body["order"]["status"], "PARTIALLY_DELIVERED");

    let remainder = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": order_id, "outletId": app.outlet.id, "status": "PARTIAL_CANCEL" })),
        )
        .await;
    assert_eq!(remainder.status, StatusCode::OK, "{}", remainder.body);
    assert_eq!(
        remainder.body["message"],
        "Undelivered items cancelled, stock restored, and ₹15.00 refunded"
    );
    assert_eq!(remainder.body["refundAmount"], 1500);
    assert_eq!(app.stock(samosa.id).await, 10);
    assert_eq!(app.stock(tea.id).await, 8);

    let samosa_item = item_id_for(order, samosa.id);
    let reopened = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({
                "orderId": order_id,
                "outletId": app.outlet.id,
                "status": "PARTIALLY_DELIVERED",
                "orderItemIds": [samosa_item],
            })),
        )
        .await;
    assert_eq!(reopened.status, StatusCode::BAD_REQUEST);
    assert_eq!(reopened.body["code"], "INVALID_STATUS_TRANSITION");
    assert_eq!(app.stock(samosa.id).await, 10);
}

#[tokio::test]
async fn test_partial_delivery_needs_item_ids() {
    let app = TestApp::new().await;
    let tea = app.add_product("Masala Tea", 1000, false, 10).await;
    let placed = app.place_cash_order(&[(tea.id, 1)]).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let response = app
        .as_staff(
            Method::PUT,
            &format!("{BASE}/update-order"),
            Some(json!({ "orderId": order_id, "outletId": app.outlet.id, "status": "PARTIALLY_DELIVERED" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_order_for_outlet() {
    let app = TestApp::new().await;
    let tea = app.add_product("Masala Tea", 1000, false, 10).await;
    let placed = app.place_cash_order(&[(tea.id, 1)]).await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let found = app
        .as_staff(Method::GET, &format!("{BASE}/get-order/{}/{order_id}", app.outlet.id), None)
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["message"], "Order fetched successfully");
    assert_eq!(found.body["order"]["items"][0]["productName"], "Masala Tea");

    let missing = app
        .as_staff(Method::GET, &format!("{BASE}/get-order/{}/999", app.outlet.id), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_order_is_delivered_immediately() {
    let app = TestApp::new().await;
    let thali = app.add_product("Veg Thali", 5000, true, 10).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("{BASE}/add-manual-order"),
            Some(json!({
                "outletId": app.outlet.id,
                "paymentMethod": "CASH",
                "items": [{ "productId": thali.id, "quantity": 2 }],
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let order = &response.body["order"];
    assert_eq!(order["orderType"], "MANUAL");
    assert_eq!(order["status"], "DELIVERED");
    assert_eq!(order["totalAmount"], 10_000);
    assert_eq!(app.stock(thali.id).await, 8);
}

#[tokio::test]
async fn test_manual_order_rejects_wallet() {
    let app = TestApp::new().await;
    let tea = app.add_product("Masala Tea", 1000, false, 10).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("{BASE}/add-manual-order"),
            Some(json!({
                "outletId": app.outlet.id,
                "paymentMethod": "WALLET",
                "items": [{ "productId": tea.id, "quantity": 1 }],
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock(tea.id).await, 10);
}
