//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite unique constraints that the
//! entity macros cannot express are added as explicit indexes.

use crate::entities::{
    Coupon, CouponUsage, Order, OrderItem, Product, UserCoupon, coupon_usage, order,
    user_coupon,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info};

/// Establishes a connection to the database at `database_url`.
///
/// # Errors
/// Returns an error if the connection cannot be established
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database: {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parent tables are created before the tables that reference them.
///
/// # Errors
/// Returns an error if any DDL statement fails
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<()> {
    create_table(db, Product).await?;
    create_table(db, Coupon).await?;
    create_table(db, Order).await?;
    create_table(db, OrderItem).await?;
    create_table(db, CouponUsage).await?;
    create_table(db, UserCoupon).await?;

    let builder = db.get_database_backend();
    let indexes = [
        Index::create()
            .name("idx_user_coupons_user_coupon")
            .table(UserCoupon)
            .col(user_coupon::Column::UserId)
            .col(user_coupon::Column::CouponId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_coupon_usage_coupon_order")
            .table(CouponUsage)
            .col(coupon_usage::Column::CouponId)
            .col(coupon_usage::Column::OrderId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_coupon_usage_coupon_user")
            .table(CouponUsage)
            .col(coupon_usage::Column::CouponId)
            .col(coupon_usage::Column::UserId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_orders_user_idempotency_key")
            .table(Order)
            .col(order::Column::UserId)
            .col(order::Column::IdempotencyKey)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}

/// Connects to `database_url` and ensures the schema exists.
///
/// # Errors
/// Returns an error if connecting or creating the schema fails
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        coupon::Model as CouponModel, order::Model as OrderModel,
        product::Model as ProductModel, user_coupon::Model as UserCouponModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<CouponModel> = Coupon::find().limit(1).all(&db).await?;
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        let _: Vec<UserCouponModel> = UserCoupon::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
