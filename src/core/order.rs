//! Order business logic - atomic placement, cancellation, status changes and queries.
//!
//! [`place_order`] is the one multi-row write in the system: the order row, every line item,
//! every stock decrement and the optional coupon redemption are written inside a single
//! database transaction and either all commit or all roll back. Stock and coupon counters are
//! changed with conditional updates (see [`super::product::decrement_stock`] and
//! [`super::coupon::record_usage`]), so concurrent checkouts serialize on those rows instead
//! of overwriting each other.

use crate::{
    core::{coupon, product},
    entities::{
        Order, OrderItem,
        order::{self, OrderStatus},
        order_item,
    },
    errors::{Error, OrderError, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// Payment method recorded when the client does not name one
pub const DEFAULT_PAYMENT_METHOD: &str = "COD";

/// Where unit prices come from when an order is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingPolicy {
    /// Re-derive each unit price from the product's current sale or list price
    #[default]
    Catalog,
    /// Use the per-item price submitted with the order
    Client,
}

/// One requested line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    /// Product being bought
    pub product_id: i64,
    /// Units requested, must be positive
    pub quantity: i32,
    /// Unit price seen by the client; only used under [`PricingPolicy::Client`]
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    /// Buyer
    pub user_id: i64,
    /// Requested lines, at least one
    pub items: Vec<OrderLine>,
    /// Delivery address, must not be blank
    pub shipping_address: String,
    /// Defaults to cash on delivery
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Free-form note from the buyer
    #[serde(default)]
    pub notes: Option<String>,
    /// Discount the client computed; the server re-computes it from the coupon
    #[serde(default)]
    pub discount_amount: Decimal,
    /// Coupon to apply, matched case-insensitively
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Makes resubmission of the same checkout return the original order
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// An order with its line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Its line items
    pub items: Vec<order_item::Model>,
}

/// An order with the number of line items it holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Number of line items
    pub item_count: u64,
}

struct PricedLine {
    product_id: i64,
    quantity: i32,
    unit_price: Decimal,
}

fn coupon_code(request: &PlaceOrder) -> Option<&str> {
    request
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

fn idempotency_key(request: &PlaceOrder) -> Option<&str> {
    request
        .idempotency_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn validate_request(request: &PlaceOrder) -> Result<()> {
    if request.items.is_empty() {
        return Err(OrderError::EmptyOrder.into());
    }

    if let Some(line) = request.items.iter().find(|line| line.quantity <= 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        }
        .into());
    }

    if request.shipping_address.trim().is_empty() {
        return Err(Error::Validation {
            message: "Shipping address is required".to_string(),
        });
    }

    let discount = request.discount_amount;
    if (discount.is_sign_negative() && !discount.is_zero())
        || (coupon_code(request).is_none() && !discount.is_zero())
    {
        return Err(OrderError::InvalidDiscount { amount: discount }.into());
    }

    Ok(())
}

async fn find_by_idempotency_key<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    key: &str,
) -> Result<Option<order::Model>> {
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::IdempotencyKey.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn price_lines(
    txn: &DatabaseTransaction,
    policy: PricingPolicy,
    lines: &[OrderLine],
) -> Result<Vec<PricedLine>> {
    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let product = product::get_product_by_id(txn, line.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound {
                product_id: line.product_id,
            })?;

        let unit_price = match policy {
            PricingPolicy::Catalog => product.effective_price(),
            PricingPolicy::Client => line
                .price
                .filter(|price| !price.is_sign_negative() || price.is_zero())
                .ok_or_else(|| Error::Validation {
                    message: format!("A valid price is required for product {}", line.product_id),
                })?,
        };

        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price,
        });
    }
    Ok(priced)
}

/// Sum of `unit_price * quantity` over all lines, rejecting amounts that overflow.
fn subtotal(lines: &[PricedLine]) -> Result<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        line.unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| Error::Validation {
                message: format!("Order total is too large at product {}", line.product_id),
            })
    })
}

/// The body of [`place_order`]; every write goes through `txn`.
async fn write_order(
    txn: &DatabaseTransaction,
    policy: PricingPolicy,
    request: &PlaceOrder,
) -> Result<i64> {
    let lines = price_lines(txn, policy, &request.items).await?;
    let total_amount = coupon::round_money(subtotal(&lines)?);

    let applied = match coupon_code(request) {
        Some(code) => {
            let applied = coupon::evaluate(txn, code, total_amount, Some(request.user_id)).await?;
            if applied.discount_amount != request.discount_amount {
                warn!(
                    "Client discount {} for coupon {} differs from computed {}; using computed",
                    request.discount_amount, applied.code, applied.discount_amount
                );
            }
            Some(applied)
        }
        None => None,
    };

    let discount_amount = applied
        .as_ref()
        .map_or(Decimal::ZERO, |applied| applied.discount_amount);
    let now = Utc::now();

    let order = order::ActiveModel {
        user_id: Set(request.user_id),
        total_amount: Set(total_amount),
        discount_amount: Set(discount_amount),
        coupon_code: Set(applied.as_ref().map(|applied| applied.code.clone())),
        final_amount: Set(total_amount - discount_amount),
        status: Set(OrderStatus::Pending),
        shipping_address: Set(request.shipping_address.trim().to_string()),
        payment_method: Set(request
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
            .to_string()),
        notes: Set(request.notes.clone()),
        idempotency_key: Set(idempotency_key(request).map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let order = order.insert(txn).await?;

    for line in &lines {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.unit_price),
            ..Default::default()
        };
        item.insert(txn).await?;
        product::decrement_stock(txn, line.product_id, line.quantity).await?;
    }

    if let Some(applied) = &applied {
        coupon::record_usage(
            txn,
            applied.coupon_id,
            request.user_id,
            order.id,
            applied.discount_amount,
        )
        .await?;
    }

    Ok(order.id)
}

/// Maps a failure inside the checkout transaction to the error the caller sees.
fn checkout_error(err: Error) -> Error {
    match err {
        Error::Coupon(reason) => OrderError::CouponInvalidAtCheckout(reason).into(),
        Error::Database(db_err) => OrderError::TransactionFailed {
            reason: db_err.to_string(),
        }
        .into(),
        other => other,
    }
}

/// Places an order atomically and returns its id.
///
/// Validates the request, prices every line according to `policy`, re-evaluates the coupon
/// against the server-computed subtotal, then inserts the order and its items, decrements
/// stock and records the coupon redemption in one transaction. On any failure the
/// transaction is rolled back and nothing is visible. A request carrying an idempotency key
/// that was already used by the same user returns the existing order without writing.
///
/// # Errors
/// - [`OrderError::EmptyOrder`], [`OrderError::InvalidQuantity`],
///   [`OrderError::InvalidDiscount`] or [`Error::Validation`] for malformed requests
/// - [`OrderError::ProductNotFound`] or [`OrderError::InsufficientStock`] for a bad line
/// - [`OrderError::CouponInvalidAtCheckout`] if the coupon no longer applies
/// - [`OrderError::TransactionFailed`] if the database rejects a write
#[instrument(skip(db, request), fields(user_id = request.user_id, items = request.items.len()))]
pub async fn place_order(
    db: &DatabaseConnection,
    policy: PricingPolicy,
    request: PlaceOrder,
) -> Result<i64> {
    validate_request(&request)?;

    if let Some(key) = idempotency_key(&request) {
        if let Some(existing) = find_by_idempotency_key(db, request.user_id, key).await? {
            info!("Order {} already placed for idempotency key", existing.id);
            return Ok(existing.id);
        }
    }

    let txn = db.begin().await?;
    let outcome = write_order(&txn, policy, &request).await;
    match outcome {
        Ok(order_id) => {
            txn.commit().await.map_err(|e| {
                error!("Failed to commit order for user {}: {}", request.user_id, e);
                OrderError::TransactionFailed {
                    reason: e.to_string(),
                }
            })?;
            info!("Placed order {} for user {}", order_id, request.user_id);
            Ok(order_id)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!("Failed to roll back order transaction: {}", rollback_err);
            }

            // A concurrent submission with the same key may have won the unique index
            if let (Error::Database(_), Some(key)) = (&err, idempotency_key(&request)) {
                if let Some(existing) = find_by_idempotency_key(db, request.user_id, key).await? {
                    return Ok(existing.id);
                }
            }

            warn!("Order for user {} rolled back: {}", request.user_id, err);
            Err(checkout_error(err))
        }
    }
}

/// Cancels a pending order and restores the stock of every line, atomically.
///
/// The coupon redemption, if any, is kept.
///
/// # Errors
/// Returns [`OrderError::OrderNotFound`], [`OrderError::NotCancellable`] for any status other
/// than pending, or [`OrderError::TransactionFailed`] if the database rejects a write.
#[instrument(skip(db))]
pub async fn cancel_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let cancelled = Order::update_many()
        .set(order::ActiveModel {
            status: Set(OrderStatus::Cancelled),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .exec(&txn)
        .await?
        .rows_affected;

    if cancelled == 0 {
        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })?;
        return Err(OrderError::NotCancellable {
            status: order.status,
        }
        .into());
    }

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(&txn)
        .await?;
    for item in &items {
        product::restore_stock(&txn, item.product_id, item.quantity).await?;
    }

    txn.commit().await.map_err(|e| OrderError::TransactionFailed {
        reason: e.to_string(),
    })?;
    info!("Cancelled order {order_id}, restored {} lines", items.len());
    Ok(())
}

/// Moves an order to `next` if the status state machine allows it.
///
/// A move to [`OrderStatus::Cancelled`] goes through [`cancel_order`] so stock is restored.
/// Other moves are conditional on the status read, so a concurrent change makes this fail
/// rather than skip a state.
///
/// # Errors
/// Returns [`OrderError::OrderNotFound`], [`OrderError::InvalidTransition`], or a database error.
#[instrument(skip(db))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    next: OrderStatus,
) -> Result<order::Model> {
    let current = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(OrderError::OrderNotFound { order_id })?;

    if !current.status.can_transition_to(next) {
        return Err(OrderError::InvalidTransition {
            from: current.status,
            to: next,
        }
        .into());
    }

    if next == OrderStatus::Cancelled {
        cancel_order(db, order_id).await.map_err(|err| match err {
            Error::Order(OrderError::NotCancellable { status }) => OrderError::InvalidTransition {
                from: status,
                to: next,
            }
            .into(),
            other => other,
        })?;
    } else {
        let updated = Order::update_many()
            .set(order::ActiveModel {
                status: Set(next),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current.status))
            .exec(db)
            .await?
            .rows_affected;

        if updated == 0 {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: next,
            }
            .into());
        }
    }

    debug!("Order {order_id}: {} -> {next}", current.status);
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| OrderError::OrderNotFound { order_id }.into())
}

/// Retrieves an order with its line items.
///
/// # Errors
/// Returns [`OrderError::OrderNotFound`] or a database error.
pub async fn get_order<C: ConnectionTrait>(db: &C, order_id: i64) -> Result<OrderDetail> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(OrderError::OrderNotFound { order_id })?;
    let items = order.find_related(OrderItem).all(db).await?;
    Ok(OrderDetail { order, items })
}

async fn summarize<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderSummary>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut counts: HashMap<i64, u64> = HashMap::new();
    if !ids.is_empty() {
        for item in OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(ids))
            .all(db)
            .await?
        {
            *counts.entry(item.order_id).or_default() += 1;
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderSummary {
            item_count: counts.get(&order.id).copied().unwrap_or_default(),
            order,
        })
        .collect())
}

/// Lists a user's orders, newest first, with item counts.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_user_orders<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<Vec<OrderSummary>> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    summarize(db, orders).await
}

/// Lists all orders, newest first, optionally restricted to one status.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_orders<C: ConnectionTrait>(
    db: &C,
    status: Option<OrderStatus>,
) -> Result<Vec<OrderSummary>> {
    let mut query = Order::find();
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status));
    }
    let orders = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    summarize(db, orders).await
}
