//! User coupon entity - A personal assignment of a coupon to one user.
//!
//! Personal redemptions are exempt from the coupon's shared usage limit but each
//! assignment can be consumed exactly once (`is_used`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User coupon database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_coupons")]
pub struct Model {
    /// Unique identifier for the assignment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User the coupon is assigned to
    pub user_id: i64,
    /// Assigned coupon
    pub coupon_id: i64,
    /// Whether the assignment has been consumed
    pub is_used: bool,
    /// When the assignment was consumed
    pub used_at: Option<DateTimeUtc>,
    /// When the coupon was assigned
    pub assigned_at: DateTimeUtc,
}

/// Defines relationships between `UserCoupon` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each assignment references one coupon
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
