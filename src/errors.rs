//! Unified error types for coupon evaluation, order placement and the surrounding plumbing.
//!
//! Validation failures carry a specific kind so callers can branch on them; database
//! failures inside a checkout transaction surface as [`OrderError::TransactionFailed`]
//! after the transaction has been rolled back.

use crate::entities::order::OrderStatus;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Reasons a coupon cannot be applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// No active coupon matches the code
    #[error("Invalid coupon code")]
    NotFound,

    /// The coupon's start date is in the future
    #[error("Coupon is not yet active")]
    NotYetActive,

    /// The coupon's end date has passed
    #[error("Coupon has expired")]
    Expired,

    /// A general coupon has reached its shared usage limit
    #[error("Coupon usage limit reached")]
    LimitReached,

    /// The user already redeemed this coupon (or their personal assignment is consumed)
    #[error("You have already used this coupon")]
    AlreadyUsed,

    /// The order subtotal is below the coupon minimum
    #[error("Minimum order amount of ${0:.2} required")]
    MinimumNotMet(Decimal),
}

/// Failures of order placement, cancellation and status changes.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Decrementing stock would take the product below zero
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock {
        /// Product whose stock ran out
        product_id: i64,
    },

    /// An order line references a product that does not exist
    #[error("Product {product_id} not found")]
    ProductNotFound {
        /// Missing product
        product_id: i64,
    },

    /// No order with this id
    #[error("Order {order_id} not found")]
    OrderNotFound {
        /// Missing order
        order_id: i64,
    },

    /// The coupon passed evaluation earlier but no longer applies inside the checkout transaction
    #[error("Coupon can no longer be applied: {0}")]
    CouponInvalidAtCheckout(#[source] CouponError),

    /// The checkout transaction failed and was rolled back
    #[error("Order transaction failed: {reason}")]
    TransactionFailed {
        /// Underlying failure description
        reason: String,
    },

    /// Only pending orders can be cancelled
    #[error("Order cannot be cancelled (status: {status})")]
    NotCancellable {
        /// Status the order was in
        status: OrderStatus,
    },

    /// The requested status change is not allowed by the order state machine
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// The order has no line items
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A line item quantity is zero or negative
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        /// Product of the offending line
        product_id: i64,
        /// Submitted quantity
        quantity: i32,
    },

    /// A discount was submitted that no coupon backs
    #[error("Invalid discount amount: {amount}")]
    InvalidDiscount {
        /// Submitted discount
        amount: Decimal,
    },
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable, machine-distinguishable error kind used by the HTTP layer.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Coupon(e) => match e {
                CouponError::NotFound => "coupon_not_found",
                CouponError::NotYetActive => "coupon_not_yet_active",
                CouponError::Expired => "coupon_expired",
                CouponError::LimitReached => "coupon_limit_reached",
                CouponError::AlreadyUsed => "coupon_already_used",
                CouponError::MinimumNotMet(_) => "coupon_minimum_not_met",
            },
            Self::Order(e) => match e {
                OrderError::InsufficientStock { .. } => "insufficient_stock",
                OrderError::ProductNotFound { .. } => "product_not_found",
                OrderError::OrderNotFound { .. } => "order_not_found",
                OrderError::CouponInvalidAtCheckout(_) => "coupon_invalid_at_checkout",
                OrderError::TransactionFailed { .. } => "transaction_failed",
                OrderError::NotCancellable { .. } => "not_cancellable",
                OrderError::InvalidTransition { .. } => "invalid_transition",
                OrderError::EmptyOrder => "empty_order",
                OrderError::InvalidQuantity { .. } => "invalid_quantity",
                OrderError::InvalidDiscount { .. } => "invalid_discount",
            },
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Database(_) => "database",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimum_not_met_message_formats_amount() {
        let err = CouponError::MinimumNotMet(dec!(100));
        assert_eq!(err.to_string(), "Minimum order amount of $100.00 required");
    }

    #[test]
    fn test_kind_distinguishes_coupon_and_order_errors() {
        assert_eq!(Error::from(CouponError::Expired).kind(), "coupon_expired");
        assert_eq!(
            Error::from(OrderError::InsufficientStock { product_id: 7 }).kind(),
            "insufficient_stock"
        );
        assert_eq!(
            Error::from(OrderError::CouponInvalidAtCheckout(CouponError::LimitReached)).kind(),
            "coupon_invalid_at_checkout"
        );
    }
}
