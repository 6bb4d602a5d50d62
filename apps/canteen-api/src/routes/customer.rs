//! # Customer Routes
//!
//! Mounted under `/api/customer/outlets` (and `/api/customer/feedback`).
//! Every handler requires a CUSTOMER token; the user id always comes from
//! the token, never from the body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::info;

use crate::auth::CustomerUser;
use crate::dto::{
    ApplyCouponRequest, CancelOrderResponse, CouponPreviewResponse, FeedbackResponse, FeedbackView,
    OrderListResponse, PlaceOrderRequest, PlaceOrderResponse, RazorpayKeyResponse, SubmitFeedbackRequest,
    VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, ApiPath, AppState};
use canteen_core::payment::GatewayDetails;
use canteen_core::quota::QuotaStatus;
use canteen_core::LineItem;
use canteen_db::PlaceOrderInput;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customer-order", post(place_order))
        .route("/get-current-quota", get(current_quota))
        .route("/apply-coupon", post(apply_coupon))
        .route("/customer-ongoing-order", get(ongoing_orders))
        .route("/customer-order-history", get(order_history))
        .route("/customer-cancel-order/{order_id}", put(cancel_order))
        .route("/verify-razorpay-payment", post(verify_payment))
        .route("/razorpay-key", get(razorpay_key))
}

pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/submit", post(submit_feedback))
}

// =============================================================================
// Ordering
// =============================================================================

async fn place_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<PlaceOrderResponse>)> {
    info!(
        user_id = user.id,
        outlet_id = req.outlet_id,
        method = %req.payment_method,
        lines = req.items.len(),
        "Order requested"
    );

    let input = PlaceOrderInput {
        outlet_id: req.outlet_id,
        payment_method: req.payment_method,
        delivery_slot: req.delivery_slot,
        requested_delivery_date: req.requested_delivery_date,
        coupon_code: req.coupon_code,
        items: req.items.iter().map(LineItem::from).collect(),
        payment_details: req.payment_details,
        client_total: req.total_amount,
    };

    let placed = state.ordering.place_order(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(placed.into())))
}

async fn current_quota(State(state): State<AppState>, CustomerUser(user): CustomerUser) -> ApiResult<Json<QuotaStatus>> {
    Ok(Json(state.ordering.current_quota(user.id).await?))
}

async fn apply_coupon(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ApiJson(req): ApiJson<ApplyCouponRequest>,
) -> ApiResult<Json<CouponPreviewResponse>> {
    let preview = state
        .ordering
        .preview_coupon(user.id, &req.code, req.current_total, req.outlet_id)
        .await?;

    Ok(Json(CouponPreviewResponse {
        message: "Coupon applied successfully",
        code: preview.code,
        discount: preview.discount,
        total_after_discount: preview.total_after_discount,
    }))
}

async fn ongoing_orders(State(state): State<AppState>, CustomerUser(user): CustomerUser) -> ApiResult<Json<OrderListResponse>> {
    Ok(Json(state.ordering.ongoing_orders(user.id).await?.into()))
}

async fn order_history(State(state): State<AppState>, CustomerUser(user): CustomerUser) -> ApiResult<Json<OrderListResponse>> {
    Ok(Json(state.ordering.order_history(user.id).await?.into()))
}

async fn cancel_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ApiPath(order_id): ApiPath<i64>,
) -> ApiResult<Json<CancelOrderResponse>> {
    let outcome = state.ordering.cancel_by_customer(user.id, order_id).await?;
    Ok(Json(outcome.into()))
}

// =============================================================================
// Payments
// =============================================================================

async fn verify_payment(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ApiJson(req): ApiJson<VerifyPaymentRequest>,
) -> ApiResult<Json<VerifyPaymentResponse>> {
    let details = GatewayDetails::from(req);
    state
        .ordering
        .verify_gateway_payment(&details)
        .map_err(|e| ApiError::from(e).payment_as_bad_request())?;

    info!(user_id = user.id, payment_id = %details.razorpay_payment_id, "Gateway payment verified");
    Ok(Json(VerifyPaymentResponse {
        verified: true,
        message: "Payment verified successfully",
    }))
}

async fn razorpay_key(State(state): State<AppState>, CustomerUser(_): CustomerUser) -> Json<RazorpayKeyResponse> {
    Json(RazorpayKeyResponse {
        key_id: state.config.razorpay_key_id.clone(),
    })
}

// =============================================================================
// Feedback
// =============================================================================

async fn submit_feedback(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    ApiJson(req): ApiJson<SubmitFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let stored = state.feedback.submit(user.id, req.order_id, &req.items).await?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            message: "Feedback submitted successfully",
            feedback: stored.into_iter().map(FeedbackView::from).collect(),
        }),
    ))
}
