//! Shopper-facing order endpoints.

use super::{ApiResponse, AppState};
use crate::{
    core::order::{self, OrderDetail, OrderSummary, PlaceOrder},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Query of `GET /api/orders`
#[derive(Debug, Deserialize)]
pub struct UserOrdersQuery {
    /// Buyer whose orders to list
    pub user_id: i64,
}

/// Payload returned after a successful checkout
#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    /// Id of the new (or resubmitted) order
    pub order_id: i64,
}

/// Places an order; responds `201 Created` with the new order id.
pub async fn place(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let order_id = order::place_order(&state.db, state.pricing, request).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(PlacedOrder { order_id })))
}

/// Lists a user's orders with item counts.
pub async fn list_for_user(
    State(state): State<AppState>,
    Query(query): Query<UserOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>> {
    let orders = order::list_user_orders(&state.db, query.user_id).await?;
    Ok(ApiResponse::ok(orders))
}

/// Returns an order with its items.
pub async fn get_one(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let detail = order::get_order(&state.db, order_id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Cancels a pending order and returns it.
pub async fn cancel(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    order::cancel_order(&state.db, order_id).await?;
    let detail = order::get_order(&state.db, order_id).await?;
    Ok(ApiResponse::ok(detail))
}
