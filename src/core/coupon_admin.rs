//! Coupon administration - creating, editing and assigning coupons.
//!
//! These operations back the admin surface and startup seeding. Redemption state
//! (`used_count`, usage rows, consumed assignments) is owned by [`super::coupon`] and is
//! never rewritten here.

pub use super::coupon::normalize_code;

use crate::{
    entities::{
        Coupon, CouponUsage, UserCoupon,
        coupon::{self, DiscountType},
        coupon_usage, user_coupon,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    DatabaseConnection, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Input for [`create_coupon`] and [`update_coupon`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
    /// Code, normalized to upper case
    pub code: String,
    /// Description shown to shoppers
    #[serde(default)]
    pub description: String,
    /// Percentage or fixed
    pub discount_type: DiscountType,
    /// Percent or currency amount
    pub discount_value: Decimal,
    /// Minimum order subtotal
    #[serde(default)]
    pub min_order_amount: Decimal,
    /// Cap for percentage discounts
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    /// Shared redemption limit
    #[serde(default)]
    pub usage_limit: Option<i32>,
    /// Start of the validity window
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the validity window
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Whether the coupon can be redeemed
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// A coupon together with how many times it has been redeemed in total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponOverview {
    /// The coupon itself
    #[serde(flatten)]
    pub coupon: coupon::Model,
    /// Redemptions of every kind, counted from usage rows
    pub times_used: u64,
}

/// A personal assignment joined with its coupon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedCoupon {
    /// The assignment row, including whether it was consumed
    pub assignment: user_coupon::Model,
    /// The assigned coupon
    pub coupon: coupon::Model,
}

fn invalid(message: &str) -> Error {
    Error::Validation {
        message: message.to_string(),
    }
}

fn validate_coupon(input: &NewCoupon) -> Result<()> {
    if normalize_code(&input.code).is_empty() {
        return Err(invalid("Coupon code cannot be empty"));
    }
    if input.discount_value.is_sign_negative() && !input.discount_value.is_zero() {
        return Err(invalid("Discount value cannot be negative"));
    }
    if input.discount_type == DiscountType::Percentage
        && input.discount_value > Decimal::ONE_HUNDRED
    {
        return Err(invalid("Percentage discount cannot exceed 100"));
    }
    if input.min_order_amount.is_sign_negative() && !input.min_order_amount.is_zero() {
        return Err(invalid("Minimum order amount cannot be negative"));
    }
    if input
        .max_discount
        .is_some_and(|cap| cap.is_sign_negative() && !cap.is_zero())
    {
        return Err(invalid("Maximum discount cannot be negative"));
    }
    if input.usage_limit.is_some_and(|limit| limit <= 0) {
        return Err(invalid("Usage limit must be positive"));
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if start >= end {
            return Err(invalid("Start date must be before end date"));
        }
    }
    Ok(())
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    except_id: Option<i64>,
) -> Result<()> {
    if let Some(existing) = get_coupon_by_code(db, code).await? {
        if Some(existing.id) != except_id {
            return Err(Error::Conflict {
                message: format!("Coupon code {code} already exists"),
            });
        }
    }
    Ok(())
}

/// Looks up a coupon by code regardless of its active flag.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_coupon_by_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<Option<coupon::Model>> {
    Coupon::find()
        .filter(coupon::Column::Code.eq(normalize_code(code)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a coupon by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_coupon_by_id<C: ConnectionTrait>(
    db: &C,
    coupon_id: i64,
) -> Result<Option<coupon::Model>> {
    Coupon::find_by_id(coupon_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_coupon<C: ConnectionTrait>(db: &C, coupon_id: i64) -> Result<coupon::Model> {
    get_coupon_by_id(db, coupon_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "Coupon",
            id: coupon_id,
        })
}

/// Creates a coupon with a normalized code and `used_count = 0`.
///
/// A missing `start_date` defaults to now.
///
/// # Errors
/// Returns a validation error for malformed input, [`Error::Conflict`] if the code is taken,
/// or a database error.
#[instrument(skip(db, input), fields(code = %input.code))]
pub async fn create_coupon<C: ConnectionTrait>(db: &C, input: NewCoupon) -> Result<coupon::Model> {
    validate_coupon(&input)?;
    let code = normalize_code(&input.code);
    ensure_code_free(db, &code, None).await?;

    let now = Utc::now();
    let coupon = coupon::ActiveModel {
        code: Set(code),
        description: Set(input.description.trim().to_string()),
        discount_type: Set(input.discount_type),
        discount_value: Set(input.discount_value),
        min_order_amount: Set(input.min_order_amount),
        max_discount: Set(input.max_discount),
        usage_limit: Set(input.usage_limit),
        used_count: Set(0),
        start_date: Set(Some(input.start_date.unwrap_or(now))),
        end_date: Set(input.end_date),
        is_active: Set(input.is_active),
        created_at: Set(now),
        ..Default::default()
    };
    let coupon = coupon.insert(db).await?;
    info!("Created coupon {} (id {})", coupon.code, coupon.id);
    Ok(coupon)
}

/// Replaces a coupon's definition, keeping its redemption counter.
///
/// An omitted `start_date` keeps the current one. The new usage limit is applied in the
/// same statement that checks it against `used_count`, so a concurrent redemption cannot
/// slip the counter above it.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown id, a validation error for malformed input or
/// for a usage limit below the redemptions already made, [`Error::Conflict`] if the new code
/// belongs to another coupon, or a database error.
pub async fn update_coupon<C: ConnectionTrait>(
    db: &C,
    coupon_id: i64,
    input: NewCoupon,
) -> Result<coupon::Model> {
    validate_coupon(&input)?;
    let existing = require_coupon(db, coupon_id).await?;

    let start_date = input.start_date.or(existing.start_date);
    if let (Some(start), Some(end)) = (start_date, input.end_date) {
        if start >= end {
            return Err(invalid("Start date must be before end date"));
        }
    }

    let code = normalize_code(&input.code);
    ensure_code_free(db, &code, Some(coupon_id)).await?;

    let mut update = Coupon::update_many()
        .set(coupon::ActiveModel {
            code: Set(code),
            description: Set(input.description.trim().to_string()),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            min_order_amount: Set(input.min_order_amount),
            max_discount: Set(input.max_discount),
            usage_limit: Set(input.usage_limit),
            start_date: Set(start_date),
            end_date: Set(input.end_date),
            is_active: Set(input.is_active),
            ..Default::default()
        })
        .filter(coupon::Column::Id.eq(coupon_id));
    if let Some(limit) = input.usage_limit {
        update = update.filter(coupon::Column::UsedCount.lte(limit));
    }

    if update.exec(db).await?.rows_affected == 0 {
        return Err(invalid("Usage limit cannot be below the current usage count"));
    }
    require_coupon(db, coupon_id).await
}

/// Deletes a coupon that has never been redeemed, along with its assignments.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown id, [`Error::Conflict`] if any redemption
/// references the coupon, or a database error.
pub async fn delete_coupon(db: &DatabaseConnection, coupon_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    require_coupon(&txn, coupon_id).await?;

    let usages = CouponUsage::find()
        .filter(coupon_usage::Column::CouponId.eq(coupon_id))
        .count(&txn)
        .await?;
    if usages > 0 {
        return Err(Error::Conflict {
            message: "Cannot delete a coupon that has been used; deactivate it instead"
                .to_string(),
        });
    }

    UserCoupon::delete_many()
        .filter(user_coupon::Column::CouponId.eq(coupon_id))
        .exec(&txn)
        .await?;
    Coupon::delete_by_id(coupon_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted coupon {coupon_id}");
    Ok(())
}

/// Flips a coupon's active flag and returns the updated coupon.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown id, or a database error.
pub async fn toggle_coupon_status<C: ConnectionTrait>(
    db: &C,
    coupon_id: i64,
) -> Result<coupon::Model> {
    let existing = require_coupon(db, coupon_id).await?;
    let active = !existing.is_active;

    let mut coupon: coupon::ActiveModel = existing.into();
    coupon.is_active = Set(active);
    let coupon = coupon.update(db).await?;
    info!(
        "Coupon {} is now {}",
        coupon.code,
        if active { "active" } else { "inactive" }
    );
    Ok(coupon)
}

/// Assigns a coupon to a user as an unused personal coupon.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown coupon, [`Error::Conflict`] if the user
/// already holds it, or a database error.
pub async fn assign_coupon_to_user<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    coupon_id: i64,
) -> Result<user_coupon::Model> {
    require_coupon(db, coupon_id).await?;

    let existing = UserCoupon::find()
        .filter(user_coupon::Column::UserId.eq(user_id))
        .filter(user_coupon::Column::CouponId.eq(coupon_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::Conflict {
            message: format!("User {user_id} already has coupon {coupon_id}"),
        });
    }

    let assignment = user_coupon::ActiveModel {
        user_id: Set(user_id),
        coupon_id: Set(coupon_id),
        is_used: Set(false),
        used_at: Set(None),
        assigned_at: Set(Utc::now()),
        ..Default::default()
    };
    assignment.insert(db).await.map_err(Into::into)
}

/// Lists a user's personal assignments, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_user_coupons<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<Vec<AssignedCoupon>> {
    let rows = UserCoupon::find()
        .filter(user_coupon::Column::UserId.eq(user_id))
        .order_by_desc(user_coupon::Column::AssignedAt)
        .find_also_related(Coupon)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(assignment, coupon)| {
            coupon.map(|coupon| AssignedCoupon { assignment, coupon })
        })
        .collect())
}

/// Removes a personal assignment by its id.
///
/// # Errors
/// Returns [`Error::NotFound`] for an unknown assignment, or a database error.
pub async fn remove_user_coupon<C: ConnectionTrait>(db: &C, assignment_id: i64) -> Result<()> {
    let result = UserCoupon::delete_by_id(assignment_id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "User coupon",
            id: assignment_id,
        });
    }
    Ok(())
}

/// Lists every coupon, newest first, with its total redemption count.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_coupons<C: ConnectionTrait>(db: &C) -> Result<Vec<CouponOverview>> {
    let coupons = Coupon::find()
        .order_by_desc(coupon::Column::CreatedAt)
        .order_by_desc(coupon::Column::Id)
        .all(db)
        .await?;

    let mut counts: HashMap<i64, u64> = HashMap::new();
    for usage in CouponUsage::find().all(db).await? {
        *counts.entry(usage.coupon_id).or_default() += 1;
    }

    Ok(coupons
        .into_iter()
        .map(|coupon| CouponOverview {
            times_used: counts.get(&coupon.id).copied().unwrap_or_default(),
            coupon,
        })
        .collect())
}
