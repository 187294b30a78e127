//! Coupon usage entity - One immutable redemption record.
//!
//! A row links the coupon, the redeeming user and the order it was applied to, together
//! with the discount that was actually granted.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon usage database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_usage")]
pub struct Model {
    /// Unique identifier for the redemption
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Redeemed coupon
    pub coupon_id: i64,
    /// User who redeemed it
    pub user_id: i64,
    /// Order the discount was applied to
    pub order_id: i64,
    /// Discount granted, rounded to cents
    pub discount_amount: Decimal,
    /// When the redemption was recorded
    pub used_at: DateTimeUtc,
}

/// Defines relationships between `CouponUsage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each redemption belongs to one coupon
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
    /// Each redemption belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
