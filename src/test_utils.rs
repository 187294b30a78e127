//! Shared test utilities for the checkout core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        coupon_admin::{self, NewCoupon},
        product::{self, NewProduct},
    },
    entities::{self, coupon::DiscountType, order::OrderStatus},
    errors::Result,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, DatabaseConnection, Set};
use tempfile::NamedTempFile;

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool is capped at one connection: every connection to `sqlite::memory:` opens a
/// separate database, so concurrent tasks must share the single one.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in WAL mode behind a multi-connection pool.
///
/// Transactions on different pooled connections genuinely overlap, so concurrent tests
/// exercise the database guards rather than a serialized pool. The returned file must
/// outlive the connection.
pub async fn setup_shared_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", file.path().display()));
    options.max_connections(8).min_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    db.execute_unprepared("PRAGMA journal_mode=WAL").await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, file))
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * price: 10
/// * no sale price
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    stock: i32,
) -> Result<entities::product::Model> {
    create_custom_product(db, name, Decimal::TEN, None, stock).await
}

/// Creates a test product with custom prices.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
    discount_price: Option<Decimal>,
    stock: i32,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            price,
            discount_price,
            stock,
        },
    )
    .await
}

/// Builds coupon input for a fixed-amount coupon with no limit or end date.
pub fn fixed_coupon_input(code: &str, value: Decimal, min_order_amount: Decimal) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        description: format!("{code} test coupon"),
        discount_type: DiscountType::Fixed,
        discount_value: value,
        min_order_amount,
        max_discount: None,
        usage_limit: None,
        start_date: None,
        end_date: None,
        is_active: true,
    }
}

/// Creates an active fixed-amount coupon.
pub async fn create_fixed_coupon(
    db: &DatabaseConnection,
    code: &str,
    value: Decimal,
    min_order_amount: Decimal,
) -> Result<entities::coupon::Model> {
    coupon_admin::create_coupon(db, fixed_coupon_input(code, value, min_order_amount)).await
}

/// Creates an active percentage coupon.
pub async fn create_percentage_coupon(
    db: &DatabaseConnection,
    code: &str,
    percent: Decimal,
    min_order_amount: Decimal,
    max_discount: Option<Decimal>,
) -> Result<entities::coupon::Model> {
    let mut input = fixed_coupon_input(code, percent, min_order_amount);
    input.discount_type = DiscountType::Percentage;
    input.max_discount = max_discount;
    coupon_admin::create_coupon(db, input).await
}

/// Creates an active fixed coupon worth 5 with a shared usage limit.
pub async fn create_limited_coupon(
    db: &DatabaseConnection,
    code: &str,
    usage_limit: i32,
) -> Result<entities::coupon::Model> {
    let mut input = fixed_coupon_input(code, Decimal::from(5), Decimal::ZERO);
    input.usage_limit = Some(usage_limit);
    coupon_admin::create_coupon(db, input).await
}

/// Inserts a bare pending order row for tests that need an order id to reference.
pub async fn create_test_order(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<entities::order::Model> {
    let now = Utc::now();
    let order = entities::order::ActiveModel {
        user_id: Set(user_id),
        total_amount: Set(Decimal::ONE_HUNDRED),
        discount_amount: Set(Decimal::ZERO),
        coupon_code: Set(None),
        final_amount: Set(Decimal::ONE_HUNDRED),
        status: Set(OrderStatus::Pending),
        shipping_address: Set("1 Test Street".to_string()),
        payment_method: Set("COD".to_string()),
        notes: Set(None),
        idempotency_key: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    order.insert(db).await.map_err(Into::into)
}
