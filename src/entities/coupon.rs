//! Coupon entity - A discount code that can be redeemed against an order.
//!
//! Codes are stored in their canonical upper-case form. `used_count` only ever grows, and
//! is bounded by `usage_limit` when one is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a coupon's `discount_value` is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` percent of the order amount, optionally capped by `max_discount`
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// A flat `discount_value` off the order amount
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Coupon database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Upper-case coupon code (e.g., `"SAVE15"`)
    #[sea_orm(unique)]
    pub code: String,
    /// Human-readable description shown to shoppers
    pub description: String,
    /// Percentage or fixed discount
    pub discount_type: DiscountType,
    /// Percent (0-100) or currency amount depending on `discount_type`
    pub discount_value: Decimal,
    /// Minimum order subtotal required to redeem
    pub min_order_amount: Decimal,
    /// Cap on the computed discount (percentage coupons only)
    pub max_discount: Option<Decimal>,
    /// Maximum number of general redemptions, unlimited when None
    pub usage_limit: Option<i32>,
    /// Number of general (non-personal) redemptions so far.
    ///
    /// Personal redemptions are not counted here, so the counter stays within
    /// `usage_limit`; they are visible as `coupon_usage` rows and consumed assignments.
    pub used_count: i32,
    /// Coupon is not valid before this instant
    pub start_date: Option<DateTimeUtc>,
    /// Coupon is not valid after this instant
    pub end_date: Option<DateTimeUtc>,
    /// Inactive coupons behave as if they do not exist
    pub is_active: bool,
    /// When the coupon was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether the shared usage limit has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.used_count >= limit)
    }

    /// Whether `now` falls inside the coupon's validity window.
    #[must_use]
    pub fn is_within_window(&self, now: DateTimeUtc) -> bool {
        self.start_date.is_none_or(|start| now >= start)
            && self.end_date.is_none_or(|end| now <= end)
    }
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One coupon has many redemptions
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    Usages,
    /// One coupon can be personally assigned to many users
    #[sea_orm(has_many = "super::user_coupon::Entity")]
    Assignments,
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl Related<super::user_coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
