//! Product business logic - the catalog operations checkout depends on.
//!
//! The catalog subsystem owns products; this module provides creation and lookup for
//! seeding and tests, plus the two stock mutations order placement and cancellation
//! perform inside their transactions. Both mutations are single conditional `UPDATE`
//! statements, so concurrent checkouts can never drive stock below zero.

use crate::{
    entities::{Product, product},
    errors::{Error, OrderError, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*, sea_query::Expr};

/// Input for [`create_product`]
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// List price per unit
    pub price: Decimal,
    /// Optional sale price per unit
    pub discount_price: Option<Decimal>,
    /// Initial stock
    pub stock: i32,
}

/// Creates a new product with the specified parameters, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - A price is negative, or the stock is negative
/// - The database insert operation fails
pub async fn create_product<C: ConnectionTrait>(
    db: &C,
    new_product: NewProduct,
) -> Result<product::Model> {
    if new_product.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }

    if new_product.price.is_sign_negative()
        || new_product
            .discount_price
            .is_some_and(|p| p.is_sign_negative())
    {
        return Err(Error::Validation {
            message: "Product prices cannot be negative".to_string(),
        });
    }

    if new_product.stock < 0 {
        return Err(Error::Validation {
            message: "Product stock cannot be negative".to_string(),
        });
    }

    let now = Utc::now();
    let product = product::ActiveModel {
        name: Set(new_product.name.trim().to_string()),
        price: Set(new_product.price),
        discount_price: Set(new_product.discount_price),
        stock: Set(new_product.stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Atomically removes `quantity` units from a product's stock.
///
/// Executes `UPDATE products SET stock = stock - q WHERE id = ? AND stock >= q` and checks the
/// affected-row count instead of reading and writing back, so two concurrent checkouts cannot
/// both take the last units.
///
/// # Errors
/// Returns [`OrderError::InsufficientStock`] if fewer than `quantity` units are on hand,
/// [`OrderError::ProductNotFound`] if the product does not exist, or a database error.
pub async fn decrement_stock<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
    quantity: i32,
) -> Result<()> {
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    if get_product_by_id(db, product_id).await?.is_none() {
        return Err(OrderError::ProductNotFound { product_id }.into());
    }
    Err(OrderError::InsufficientStock { product_id }.into())
}

/// Atomically returns `quantity` units to a product's stock.
///
/// # Errors
/// Returns [`OrderError::ProductNotFound`] if the product does not exist, or a database error.
pub async fn restore_stock<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
    quantity: i32,
) -> Result<()> {
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(OrderError::ProductNotFound { product_id }.into());
    }
    Ok(())
}
