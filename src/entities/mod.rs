//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coupon;
pub mod coupon_usage;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user_coupon;

// Re-export specific types to avoid conflicts
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
pub use coupon_usage::{
    Column as CouponUsageColumn, Entity as CouponUsage, Model as CouponUsageModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use user_coupon::{
    Column as UserCouponColumn, Entity as UserCoupon, Model as UserCouponModel,
};
