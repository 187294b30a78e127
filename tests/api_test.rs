//! Integration tests for the checkout HTTP API
//!
//! These drive the full router (routing, JSON extraction, core logic, SQLite and error
//! rendering) with `tower::ServiceExt::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use std::str::FromStr;
use storefront_checkout::{
    api::{AppState, create_app},
    config::database::create_tables,
    core::{
        coupon_admin::{self, NewCoupon},
        order::PricingPolicy,
        product::{self, NewProduct},
    },
    entities::coupon::DiscountType,
};
use tower::ServiceExt;

async fn setup() -> (Router, DatabaseConnection) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    create_tables(&db).await.unwrap();

    let app = create_app(AppState {
        db: db.clone(),
        pricing: PricingPolicy::Catalog,
    });
    (app, db)
}

async fn add_product(db: &DatabaseConnection, price: Decimal, stock: i32) -> i64 {
    product::create_product(
        db,
        NewProduct {
            name: "Desk".to_string(),
            price,
            discount_price: None,
            stock,
        },
    )
    .await
    .unwrap()
    .id
}

async fn add_coupon(
    db: &DatabaseConnection,
    code: &str,
    discount_type: DiscountType,
    value: Decimal,
    min_order_amount: Decimal,
    max_discount: Option<Decimal>,
) -> i64 {
    coupon_admin::create_coupon(
        db,
        NewCoupon {
            code: code.to_string(),
            description: String::new(),
            discount_type,
            discount_value: value,
            min_order_amount,
            max_discount,
            usage_limit: None,
            start_date: None,
            end_date: None,
            is_active: true,
        },
    )
    .await
    .unwrap()
    .id
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(payload) => {
            request = request.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

#[tokio::test]
async fn test_health() {
    let (app, _db) = setup().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_validate_coupon() {
    let (app, db) = setup().await;
    add_coupon(&db, "SAVE15", DiscountType::Percentage, dec!(15), dec!(50), Some(dec!(30))).await;
    add_coupon(&db, "FLAT20", DiscountType::Fixed, dec!(20), dec!(100), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/coupons/validate",
        Some(json!({ "code": "save15", "order_amount": "300.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(money(&body["data"]["discount_amount"]), dec!(30));
    assert_eq!(money(&body["data"]["final_amount"]), dec!(270));

    let (status, body) = send(
        &app,
        "POST",
        "/api/coupons/validate",
        Some(json!({ "code": "FLAT20", "order_amount": 80, "user_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "coupon_minimum_not_met");
    assert_eq!(body["message"], "Minimum order amount of $100.00 required");

    let (status, body) = send(
        &app,
        "POST",
        "/api/coupons/validate",
        Some(json!({ "code": "NOPE", "order_amount": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "coupon_not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/coupons/validate",
        Some(json!({ "code": "SAVE15", "order_amount": Decimal::MAX.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_checkout_flow() {
    let (app, db) = setup().await;
    let desk = add_product(&db, dec!(100), 5).await;
    add_coupon(&db, "SAVE15", DiscountType::Percentage, dec!(15), dec!(50), Some(dec!(30))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({
            "user_id": 7,
            "items": [{ "product_id": desk, "quantity": 3, "price": "100.00" }],
            "shipping_address": "12 Elm Street",
            "coupon_code": "SAVE15",
            "discount_amount": "30.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["order_id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_method"], "COD");
    assert_eq!(order["coupon_code"], "SAVE15");
    assert_eq!(money(&order["total_amount"]), dec!(300));
    assert_eq!(money(&order["discount_amount"]), dec!(30));
    assert_eq!(money(&order["final_amount"]), dec!(270));
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/api/orders?user_id=7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["item_count"], 1);

    // Not enough stock left for a second large order
    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({
            "user_id": 8,
            "items": [{ "product_id": desk, "quantity": 3 }],
            "shipping_address": "14 Elm Street"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) =
        send(&app, "POST", &format!("/api/orders/{order_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) =
        send(&app, "POST", &format!("/api/orders/{order_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_cancellable");
}

#[tokio::test]
async fn test_checkout_rejects_empty_order_and_reused_coupon() {
    let (app, db) = setup().await;
    let desk = add_product(&db, dec!(100), 10).await;
    add_coupon(&db, "FLAT20", DiscountType::Fixed, dec!(20), dec!(100), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({ "user_id": 1, "items": [], "shipping_address": "Somewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_order");

    let checkout = json!({
        "user_id": 1,
        "items": [{ "product_id": desk, "quantity": 1 }],
        "shipping_address": "Somewhere",
        "coupon_code": "FLAT20",
        "discount_amount": 20
    });
    let (status, _) = send(&app, "POST", "/api/orders", Some(checkout.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/orders", Some(checkout)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "coupon_invalid_at_checkout");
}

#[tokio::test]
async fn test_admin_coupon_management() {
    let (app, _db) = setup().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/coupons",
        Some(json!({
            "code": "vip50",
            "description": "VIP",
            "discount_type": "fixed",
            "discount_value": "50",
            "usage_limit": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["code"], "VIP50");
    let coupon_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/coupons",
        Some(json!({ "code": "VIP50", "discount_type": "fixed", "discount_value": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/user-coupons",
        Some(json!({ "user_id": 3, "coupon_id": coupon_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let assignment_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", "/api/coupons?user_id=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["code"], "VIP50");
    assert_eq!(body["data"][0]["personal"], true);

    let (status, body) = send(&app, "GET", "/api/admin/user-coupons?user_id=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/admin/coupons/{coupon_id}/toggle"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, body) = send(&app, "GET", "/api/admin/coupons/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_coupons"], 1);
    assert_eq!(body["data"]["active_coupons"], 0);
    assert_eq!(body["data"]["unused_assignments"], 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/user-coupons/{assignment_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/api/admin/coupons/{coupon_id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/admin/coupons", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_order_status_and_stats() {
    let (app, db) = setup().await;
    let desk = add_product(&db, dec!(25), 10).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({
            "user_id": 1,
            "items": [{ "product_id": desk, "quantity": 2 }],
            "shipping_address": "1 Main St",
            "payment_method": "card"
        })),
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().unwrap();

    let uri = format!("/api/admin/orders/{order_id}/status");
    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": "processing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, body) = send(&app, "GET", "/api/admin/orders?status=confirmed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/api/admin/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_orders"], 1);
    assert_eq!(body["data"]["pending_orders"], 0);
    assert_eq!(money(&body["data"]["total_revenue"]), dec!(50));

    let (status, body) = send(&app, "GET", "/api/orders/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "order_not_found");
}
