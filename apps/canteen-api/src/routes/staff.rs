//! # Staff Routes
//!
//! Mounted under `/api/staff/outlets`. Requires STAFF or SUPERADMIN; staff
//! assigned to an outlet may only touch that outlet's orders.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::info;

use crate::auth::StaffUser;
use crate::dto::{ManualOrderRequest, OrderResponse, UpdateOrderRequest, UpdateOrderResponse};
use crate::error::ApiResult;
use crate::{ApiJson, ApiPath, AppState};
use canteen_core::order::StaffAction;
use canteen_core::LineItem;
use canteen_db::{ManualOrderInput, UpdateOrderInput};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/update-order", put(update_order))
        .route("/get-order/{outlet_id}/{order_id}", get(get_order))
        .route("/add-manual-order", post(add_manual_order))
}

async fn update_order(
    State(state): State<AppState>,
    staff: StaffUser,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> ApiResult<Json<UpdateOrderResponse>> {
    let status: StaffAction = req.status.parse()?;
    info!(
        staff_id = staff.0.id,
        order_id = req.order_id,
        outlet_id = req.outlet_id,
        status = %req.status,
        "Order update requested"
    );

    let outcome = state
        .ordering
        .update_order(
            staff.actor(),
            UpdateOrderInput {
                order_id: req.order_id,
                outlet_id: req.outlet_id,
                status,
                order_item_ids: req.order_item_ids.unwrap_or_default(),
            },
        )
        .await?;

    Ok(Json(outcome.into()))
}

async fn get_order(
    State(state): State<AppState>,
    staff: StaffUser,
    ApiPath((outlet_id, order_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<OrderResponse>> {
    let details = state.ordering.order_for_outlet(staff.actor(), outlet_id, order_id).await?;

    Ok(Json(OrderResponse {
        message: "Order fetched successfully",
        order: details.into(),
    }))
}

async fn add_manual_order(
    State(state): State<AppState>,
    staff: StaffUser,
    ApiJson(req): ApiJson<ManualOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let details = state
        .ordering
        .add_manual_order(
            staff.actor(),
            ManualOrderInput {
                outlet_id: req.outlet_id,
                payment_method: req.payment_method,
                items: req.items.iter().map(LineItem::from).collect(),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Manual order added successfully",
            order: details.into(),
        }),
    ))
}
