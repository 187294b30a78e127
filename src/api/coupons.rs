//! Shopper-facing coupon endpoints.

use super::{ApiResponse, AppState};
use crate::{
    core::coupon::{self, AppliedCoupon, AvailableCoupon},
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Body of `POST /api/coupons/validate`
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Coupon code as typed
    pub code: String,
    /// Cart subtotal
    pub order_amount: Decimal,
    /// Shopper, enabling personal and once-per-user checks
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Query of `GET /api/coupons`
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// Include this shopper's personal coupons
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Evaluates a coupon code against an order amount without redeeming it.
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ApiResponse<AppliedCoupon>>> {
    let applied =
        coupon::evaluate(&state.db, &request.code, request.order_amount, request.user_id).await?;
    Ok(ApiResponse::ok(applied))
}

/// Lists the coupons a shopper can use now.
pub async fn list_available(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<AvailableCoupon>>>> {
    let available = coupon::list_available_coupons(&state.db, query.user_id, Utc::now()).await?;
    Ok(ApiResponse::ok(available))
}
