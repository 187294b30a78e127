//! Order entity - A placed order and its lifecycle status.
//!
//! `final_amount` is always `total_amount - discount_amount`. Status only moves forward
//! through [`OrderStatus`], except that a pending order may be cancelled.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting confirmation
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the store and being processed
    #[sea_orm(string_value = "confirmed")]
    #[serde(alias = "processing")]
    Confirmed,
    /// Handed to the carrier
    #[sea_orm(string_value = "shipped")]
    Shipped,
    /// Received by the customer
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Cancelled before confirmation
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// `Pending -> {Confirmed, Cancelled}`, `Confirmed -> Shipped`, `Shipped -> Delivered`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Lower-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who placed the order
    pub user_id: i64,
    /// Subtotal before discount
    pub total_amount: Decimal,
    /// Discount granted by the applied coupon
    pub discount_amount: Decimal,
    /// Code of the applied coupon, denormalized for display
    pub coupon_code: Option<String>,
    /// Amount charged: `total_amount - discount_amount`
    pub final_amount: Decimal,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Free-form delivery address
    pub shipping_address: String,
    /// Payment method label (e.g., `"COD"`)
    pub payment_method: String,
    /// Optional customer notes
    pub notes: Option<String>,
    /// Client-supplied key that makes order submission safe to retry
    pub idempotency_key: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
    /// One order has at most one coupon redemption
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    CouponUsages,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CouponUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
