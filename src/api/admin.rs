//! Admin endpoints: order administration, coupon management and dashboard statistics.

use super::{ApiResponse, AppState};
use crate::{
    core::{
        coupon_admin::{self, AssignedCoupon, CouponOverview, NewCoupon},
        order::{self, OrderSummary},
        report::{self, CouponStats, OrderStats},
    },
    entities::{coupon, order::OrderStatus, user_coupon},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Query of `GET /api/admin/orders`
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// Only orders in this status
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Body of `PUT /api/admin/orders/:id/status`
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// Target status
    pub status: OrderStatus,
}

/// Query of `GET /api/admin/user-coupons`
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Assignee
    pub user_id: i64,
}

/// Body of `POST /api/admin/user-coupons`
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Assignee
    pub user_id: i64,
    /// Coupon to assign
    pub coupon_id: i64,
}

/// Order counts and revenue.
pub async fn order_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<OrderStats>>> {
    Ok(ApiResponse::ok(report::order_stats(&state.db).await?))
}

/// Lists all orders, optionally filtered by status.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>> {
    Ok(ApiResponse::ok(
        order::list_orders(&state.db, query.status).await?,
    ))
}

/// Moves an order to a new status.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ApiResponse<crate::entities::order::Model>>> {
    let order = order::update_order_status(&state.db, order_id, update.status).await?;
    Ok(ApiResponse::ok(order))
}

/// Lists coupons with their redemption counts.
pub async fn list_coupons(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CouponOverview>>>> {
    Ok(ApiResponse::ok(coupon_admin::list_coupons(&state.db).await?))
}

/// Creates a coupon; responds `201 Created`.
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(input): Json<NewCoupon>,
) -> Result<(StatusCode, Json<ApiResponse<coupon::Model>>)> {
    let coupon = coupon_admin::create_coupon(&state.db, input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(coupon)))
}

/// Replaces a coupon's definition.
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<i64>,
    Json(input): Json<NewCoupon>,
) -> Result<Json<ApiResponse<coupon::Model>>> {
    Ok(ApiResponse::ok(
        coupon_admin::update_coupon(&state.db, coupon_id, input).await?,
    ))
}

/// Deletes a coupon that was never redeemed.
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>> {
    coupon_admin::delete_coupon(&state.db, coupon_id).await?;
    Ok(ApiResponse::ok(json!({ "deleted": coupon_id })))
}

/// Flips a coupon's active flag.
pub async fn toggle_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<i64>,
) -> Result<Json<ApiResponse<coupon::Model>>> {
    Ok(ApiResponse::ok(
        coupon_admin::toggle_coupon_status(&state.db, coupon_id).await?,
    ))
}

/// Coupon counts and discount totals.
pub async fn coupon_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<CouponStats>>> {
    Ok(ApiResponse::ok(report::coupon_stats(&state.db).await?))
}

/// Lists a user's personal coupons.
pub async fn list_user_coupons(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<AssignedCoupon>>>> {
    Ok(ApiResponse::ok(
        coupon_admin::list_user_coupons(&state.db, query.user_id).await?,
    ))
}

/// Assigns a coupon to a user; responds `201 Created`.
pub async fn assign_coupon(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<user_coupon::Model>>)> {
    let assignment =
        coupon_admin::assign_coupon_to_user(&state.db, request.user_id, request.coupon_id).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(assignment)))
}

/// Removes a personal assignment.
pub async fn remove_user_coupon(
    State(state): State<AppState>,
    Path(assignment_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>> {
    coupon_admin::remove_user_coupon(&state.db, assignment_id).await?;
    Ok(ApiResponse::ok(json!({ "deleted": assignment_id })))
}
