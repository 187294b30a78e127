//! Report generation business logic.
//!
//! Read-side aggregates for the admin dashboard. Totals are summed in Rust over `Decimal`
//! values so no floating point enters the money figures.

use crate::{
    entities::{
        Coupon, CouponUsage, Order, UserCoupon, coupon,
        order::{self, OrderStatus},
        user_coupon,
    },
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, prelude::*};
use serde::Serialize;

/// Order counts and revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    /// All orders ever placed
    pub total_orders: u64,
    /// Orders awaiting confirmation
    pub pending_orders: u64,
    /// Sum of `total_amount` over orders that were not cancelled
    pub total_revenue: Decimal,
}

/// Coupon counts and the value they have given away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponStats {
    /// Coupons defined, active or not
    pub total_coupons: u64,
    /// Coupons currently redeemable by flag
    pub active_coupons: u64,
    /// Redemptions of every kind
    pub total_usage: u64,
    /// Sum of recorded redemption discounts
    pub total_discount_given: Decimal,
    /// Personal assignments not yet redeemed
    pub unused_assignments: u64,
}

/// Computes order statistics.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn order_stats<C: ConnectionTrait>(db: &C) -> Result<OrderStats> {
    let total_orders = Order::find().count(db).await?;
    let pending_orders = Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .count(db)
        .await?;

    let total_revenue: Decimal = Order::find()
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .all(db)
        .await?
        .iter()
        .map(|order| order.total_amount)
        .sum();

    Ok(OrderStats {
        total_orders,
        pending_orders,
        total_revenue,
    })
}

/// Computes coupon statistics.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn coupon_stats<C: ConnectionTrait>(db: &C) -> Result<CouponStats> {
    let total_coupons = Coupon::find().count(db).await?;
    let active_coupons = Coupon::find()
        .filter(coupon::Column::IsActive.eq(true))
        .count(db)
        .await?;

    let usages = CouponUsage::find().all(db).await?;
    let total_discount_given: Decimal = usages.iter().map(|usage| usage.discount_amount).sum();

    let unused_assignments = UserCoupon::find()
        .filter(user_coupon::Column::IsUsed.eq(false))
        .count(db)
        .await?;

    Ok(CouponStats {
        total_coupons,
        active_coupons,
        total_usage: usages.len() as u64,
        total_discount_given,
        unused_assignments,
    })
}
