//! Coupon business logic - evaluation, discount computation and redemption recording.
//!
//! Evaluation is read-only: [`evaluate`] decides whether a code applies to an order amount
//! for an optional user and computes the discount, without touching any counter.
//! Redemption is recorded separately by [`record_usage`], which only runs inside the
//! order placement transaction so abandoned checkouts never consume a coupon.
//!
//! Two kinds of redemption exist. A *personal* redemption consumes an unused
//! [`user_coupon`] assignment and ignores the coupon's shared `usage_limit`. Every other
//! redemption is *general*: it draws from the shared limit and a user may perform it at
//! most once per coupon. `used_count` tracks general redemptions, so it never exceeds
//! `usage_limit`; every redemption of either kind leaves a [`coupon_usage`] row.

use crate::{
    entities::{
        Coupon, CouponUsage, UserCoupon,
        coupon::{self, DiscountType},
        coupon_usage, user_coupon,
    },
    errors::{CouponError, Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{Condition, DatabaseTransaction, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// A coupon that passed evaluation, with the discount it grants on the evaluated amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    /// Coupon identifier
    pub coupon_id: i64,
    /// Canonical (upper-case) code
    pub code: String,
    /// Description shown to shoppers
    pub description: String,
    /// Percentage or fixed
    pub discount_type: DiscountType,
    /// Percent or currency amount
    pub discount_value: Decimal,
    /// Discount granted, rounded to cents and never above the order amount
    pub discount_amount: Decimal,
    /// Order amount rounded to cents, minus `discount_amount`
    pub final_amount: Decimal,
    /// Whether this redemption consumes a personal assignment
    pub personal: bool,
}

/// A coupon a shopper can currently use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableCoupon {
    /// The coupon itself
    #[serde(flatten)]
    pub coupon: coupon::Model,
    /// Whether it is available through a personal assignment
    pub personal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redemption {
    General,
    Personal,
}

/// Canonical form of a coupon code: trimmed and upper-cased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Rounds a monetary amount to cents, halves away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rejection for amounts whose arithmetic would leave the decimal range.
fn amount_too_large() -> Error {
    Error::Validation {
        message: "Amount is too large".to_string(),
    }
}

/// Computes the discount `coupon` grants on `order_amount`.
///
/// Percentage coupons take `discount_value` percent, capped by `max_discount` when set.
/// Fixed coupons take `discount_value`. The result is rounded to cents and clamped to
/// `[0, round_money(order_amount)]`, so the final amount is never negative.
///
/// # Errors
/// Returns a validation error if the percentage computation overflows.
pub fn compute_discount(coupon: &coupon::Model, order_amount: Decimal) -> Result<Decimal> {
    let order_amount = order_amount.max(Decimal::ZERO);
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let discount = order_amount
                .checked_mul(coupon.discount_value)
                .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(amount_too_large)?;
            coupon.max_discount.map_or(discount, |cap| discount.min(cap))
        }
        DiscountType::Fixed => coupon.discount_value,
    };

    Ok(round_money(raw)
        .min(round_money(order_amount))
        .max(Decimal::ZERO))
}

/// Looks up an active coupon by code, normalizing the code first.
async fn find_active_coupon<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<Option<coupon::Model>> {
    Coupon::find()
        .filter(coupon::Column::Code.eq(normalize_code(code)))
        .filter(coupon::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_assignment<C: ConnectionTrait>(
    db: &C,
    coupon_id: i64,
    user_id: i64,
) -> Result<Option<user_coupon::Model>> {
    UserCoupon::find()
        .filter(user_coupon::Column::CouponId.eq(coupon_id))
        .filter(user_coupon::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn has_redeemed<C: ConnectionTrait>(db: &C, coupon_id: i64, user_id: i64) -> Result<bool> {
    let existing = CouponUsage::find()
        .filter(coupon_usage::Column::CouponId.eq(coupon_id))
        .filter(coupon_usage::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(existing.is_some())
}

/// Runs the eligibility checks in order and classifies the redemption.
async fn check_eligibility<C: ConnectionTrait>(
    db: &C,
    coupon: &coupon::Model,
    order_amount: Decimal,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Redemption> {
    let assignment = match user_id {
        Some(user_id) => find_assignment(db, coupon.id, user_id).await?,
        None => None,
    };

    let redemption = match assignment {
        Some(assignment) if assignment.is_used => return Err(CouponError::AlreadyUsed.into()),
        Some(_) => Redemption::Personal,
        None => Redemption::General,
    };

    if coupon.start_date.is_some_and(|start| now < start) {
        return Err(CouponError::NotYetActive.into());
    }
    if coupon.end_date.is_some_and(|end| now > end) {
        return Err(CouponError::Expired.into());
    }

    if redemption == Redemption::General && coupon.is_exhausted() {
        return Err(CouponError::LimitReached.into());
    }

    if order_amount < coupon.min_order_amount {
        return Err(CouponError::MinimumNotMet(coupon.min_order_amount).into());
    }

    if redemption == Redemption::General {
        if let Some(user_id) = user_id {
            if has_redeemed(db, coupon.id, user_id).await? {
                return Err(CouponError::AlreadyUsed.into());
            }
        }
    }

    Ok(redemption)
}

/// Evaluates `code` against `order_amount` for an optional user at the current time.
///
/// # Errors
/// Returns a [`CouponError`] describing why the coupon does not apply, a validation error
/// for a negative amount, or a database error.
pub async fn evaluate<C: ConnectionTrait>(
    db: &C,
    code: &str,
    order_amount: Decimal,
    user_id: Option<i64>,
) -> Result<AppliedCoupon> {
    evaluate_at(db, code, order_amount, user_id, Utc::now()).await
}

/// Evaluates `code` against `order_amount` for an optional user as of `now`.
///
/// Performs no writes. The checks run in this order: code lookup, personal assignment,
/// date window, shared usage limit (general only), minimum order amount, previous
/// redemption by the same user (general only).
///
/// # Errors
/// Same as [`evaluate`].
#[instrument(skip(db))]
pub async fn evaluate_at<C: ConnectionTrait>(
    db: &C,
    code: &str,
    order_amount: Decimal,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<AppliedCoupon> {
    if order_amount.is_sign_negative() && !order_amount.is_zero() {
        return Err(Error::Validation {
            message: "Order amount cannot be negative".to_string(),
        });
    }

    let coupon = find_active_coupon(db, code)
        .await?
        .ok_or(CouponError::NotFound)?;

    let redemption = check_eligibility(db, &coupon, order_amount, user_id, now).await?;
    let discount_amount = compute_discount(&coupon, order_amount)?;
    debug!(
        "Coupon {} grants {} on {} ({:?})",
        coupon.code, discount_amount, order_amount, redemption
    );

    Ok(AppliedCoupon {
        coupon_id: coupon.id,
        code: coupon.code,
        description: coupon.description,
        discount_type: coupon.discount_type,
        discount_value: coupon.discount_value,
        discount_amount,
        final_amount: round_money(order_amount) - discount_amount,
        personal: redemption == Redemption::Personal,
    })
}

/// Records one redemption of a coupon inside an open transaction.
///
/// If the user holds an unused personal assignment it is marked used; otherwise the
/// redemption is general and `used_count` is incremented, guarded by the usage limit in
/// the same statement. Either way a [`coupon_usage`] row is inserted. Every guard is a
/// conditional update checked by affected rows, so concurrent redemptions cannot exceed a
/// limit or consume an assignment twice. Taking a [`DatabaseTransaction`] ties all writes
/// to the caller's commit or rollback.
///
/// # Errors
/// Returns [`CouponError::AlreadyUsed`] if the assignment was already consumed or the user
/// already redeemed a general coupon, [`CouponError::LimitReached`] if the shared limit
/// is exhausted, [`CouponError::NotFound`] if the coupon is gone, or a database error.
#[instrument(skip(txn))]
pub async fn record_usage(
    txn: &DatabaseTransaction,
    coupon_id: i64,
    user_id: i64,
    order_id: i64,
    discount_amount: Decimal,
) -> Result<coupon_usage::Model> {
    let now = Utc::now();

    let consumed = UserCoupon::update_many()
        .set(user_coupon::ActiveModel {
            is_used: Set(true),
            used_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(user_coupon::Column::CouponId.eq(coupon_id))
        .filter(user_coupon::Column::UserId.eq(user_id))
        .filter(user_coupon::Column::IsUsed.eq(false))
        .exec(txn)
        .await?
        .rows_affected;

    if consumed == 0 {
        // A consumed assignment must not fall back to a general redemption
        if find_assignment(txn, coupon_id, user_id).await?.is_some() {
            return Err(CouponError::AlreadyUsed.into());
        }
        if has_redeemed(txn, coupon_id, user_id).await? {
            return Err(CouponError::AlreadyUsed.into());
        }

        let claimed = Coupon::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(
                        Expr::col(coupon::Column::UsedCount)
                            .lt(Expr::col(coupon::Column::UsageLimit)),
                    ),
            )
            .exec(txn)
            .await?
            .rows_affected;

        if claimed == 0 {
            let exists = Coupon::find_by_id(coupon_id).one(txn).await?.is_some();
            return Err(if exists {
                CouponError::LimitReached
            } else {
                CouponError::NotFound
            }
            .into());
        }
    }

    let usage = coupon_usage::ActiveModel {
        coupon_id: Set(coupon_id),
        user_id: Set(user_id),
        order_id: Set(order_id),
        discount_amount: Set(round_money(discount_amount)),
        used_at: Set(now),
        ..Default::default()
    };
    let usage = usage.insert(txn).await?;
    debug!(
        "Recorded {} redemption of coupon {coupon_id} for order {order_id}",
        if consumed > 0 { "personal" } else { "general" }
    );
    Ok(usage)
}

/// Lists the coupons a shopper can use right now, best discount first.
///
/// General coupons (active, inside their window, under their limit, not yet redeemed by
/// the user) and the user's unused personal assignments are fetched separately and merged
/// by code; a personal assignment takes precedence over the same general coupon.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_available_coupons<C: ConnectionTrait>(
    db: &C,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<AvailableCoupon>> {
    let redeemed: HashSet<i64> = match user_id {
        Some(user_id) => CouponUsage::find()
            .filter(coupon_usage::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|usage| usage.coupon_id)
            .collect(),
        None => HashSet::new(),
    };

    let mut by_code: HashMap<String, AvailableCoupon> = Coupon::find()
        .filter(coupon::Column::IsActive.eq(true))
        .all(db)
        .await?
        .into_iter()
        .filter(|c| c.is_within_window(now) && !c.is_exhausted() && !redeemed.contains(&c.id))
        .map(|c| {
            (
                c.code.clone(),
                AvailableCoupon {
                    coupon: c,
                    personal: false,
                },
            )
        })
        .collect();

    if let Some(user_id) = user_id {
        let assigned = UserCoupon::find()
            .filter(user_coupon::Column::UserId.eq(user_id))
            .filter(user_coupon::Column::IsUsed.eq(false))
            .find_also_related(Coupon)
            .all(db)
            .await?;

        for (_, coupon) in assigned {
            let Some(coupon) = coupon else { continue };
            if !coupon.is_active || !coupon.is_within_window(now) {
                continue;
            }
            by_code.insert(
                coupon.code.clone(),
                AvailableCoupon {
                    coupon,
                    personal: true,
                },
            );
        }
    }

    let mut available: Vec<AvailableCoupon> = by_code.into_values().collect();
    available.sort_by(|a, b| {
        b.coupon
            .discount_value
            .cmp(&a.coupon.discount_value)
            .then_with(|| a.coupon.code.cmp(&b.coupon.code))
    });
    Ok(available)
}
