//! Seed coupon configuration from config.toml
//!
//! Coupons listed under `[[coupons]]` are created on startup when no coupon with the same
//! code exists yet. Existing coupons are never modified, so admin edits survive restarts.

use crate::{
    core::coupon_admin::{self, NewCoupon},
    entities::coupon::DiscountType,
    errors::Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::info;

/// Configuration for a single seed coupon
#[derive(Debug, Deserialize, Clone)]
pub struct CouponSeed {
    /// Coupon code, normalized to upper case on insert
    pub code: String,
    /// Description shown to shoppers
    #[serde(default)]
    pub description: String,
    /// `"percentage"` or `"fixed"`
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
    /// RFC 3339 start instant
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// RFC 3339 end instant
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl From<&CouponSeed> for NewCoupon {
    fn from(seed: &CouponSeed) -> Self {
        Self {
            code: seed.code.clone(),
            description: seed.description.clone(),
            discount_type: seed.discount_type,
            discount_value: seed.discount_value,
            min_order_amount: seed.min_order_amount,
            max_discount: seed.max_discount,
            usage_limit: seed.usage_limit,
            start_date: seed.start_date,
            end_date: seed.end_date,
            is_active: true,
        }
    }
}

/// Creates every seed coupon whose code is not already present.
///
/// Returns the number of coupons created.
///
/// # Errors
/// Returns an error if a seed is invalid or a database operation fails
pub async fn seed_coupons(db: &DatabaseConnection, seeds: &[CouponSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let code = coupon_admin::normalize_code(&seed.code);
        if coupon_admin::get_coupon_by_code(db, &code).await?.is_some() {
            continue;
        }
        coupon_admin::create_coupon(db, NewCoupon::from(seed)).await?;
        info!("Seeded coupon {code}");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use rust_decimal_macros::dec;

    fn seed(code: &str) -> CouponSeed {
        CouponSeed {
            code: code.to_string(),
            description: "seeded".to_string(),
            discount_type: DiscountType::Fixed,
            discount_value: dec!(5),
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn test_seed_coupons_skips_existing_codes() -> Result<()> {
        let db = setup_test_db().await?;

        let created = seed_coupons(&db, &[seed("welcome10"), seed("FLAT20")]).await?;
        assert_eq!(created, 2);

        // Second run is a no-op, and lower-case codes match their canonical form
        let created = seed_coupons(&db, &[seed("WELCOME10"), seed("flat20")]).await?;
        assert_eq!(created, 0);

        let coupon = coupon_admin::get_coupon_by_code(&db, "WELCOME10").await?.unwrap();
        assert_eq!(coupon.discount_value, dec!(5));
        Ok(())
    }
}
