//! HTTP API - axum routes over the checkout core.
//!
//! Handlers are thin: they extract JSON or query input, call into [`crate::core`] and wrap the
//! result in [`ApiResponse`]. Failures are rendered by the [`IntoResponse`] impl for
//! [`crate::errors::Error`] in [`error`].
//!
//! [`IntoResponse`]: axum::response::IntoResponse

pub mod admin;
pub mod coupons;
pub mod error;
pub mod orders;

use crate::core::order::PricingPolicy;
use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Value, json};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Where order unit prices come from
    pub pricing: PricingPolicy,
}

/// Success wrapper: `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    /// Payload
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps `data` in a success wrapper.
    pub const fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "storefront-checkout" }))
}

/// Builds the application router.
///
/// - `GET /health` - liveness
/// - `/api/coupons` - coupon validation and listing for shoppers
/// - `/api/orders` - checkout, order history and cancellation
/// - `/api/admin` - order administration, coupon management and statistics
pub fn create_app(state: AppState) -> Router {
    let shop = Router::new()
        .route("/coupons", get(coupons::list_available))
        .route("/coupons/validate", post(coupons::validate))
        .route("/orders", get(orders::list_for_user).post(orders::place))
        .route("/orders/:id", get(orders::get_one))
        .route("/orders/:id/cancel", post(orders::cancel));

    let admin = Router::new()
        .route("/stats", get(admin::order_stats))
        .route("/orders", get(admin::list_orders))
        .route("/orders/:id/status", put(admin::update_order_status))
        .route(
            "/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route("/coupons/stats", get(admin::coupon_stats))
        .route(
            "/coupons/:id",
            put(admin::update_coupon).delete(admin::delete_coupon),
        )
        .route("/coupons/:id/toggle", post(admin::toggle_coupon))
        .route(
            "/user-coupons",
            get(admin::list_user_coupons).post(admin::assign_coupon),
        )
        .route("/user-coupons/:id", delete(admin::remove_user_coupon));

    Router::new()
        .route("/health", get(health))
        .nest("/api", shop)
        .nest("/api/admin", admin)
        .with_state(state)
}
