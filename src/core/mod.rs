//! Core business logic - framework-agnostic coupon and order operations.
//!
//! Every function takes a database connection (or an open transaction) as its first
//! argument so the same logic serves the HTTP layer, the seeding code and the tests.

/// Coupon lifecycle management for administrators
pub mod coupon_admin;
/// Coupon evaluation, discount computation and redemption recording
pub mod coupon;
/// Order placement, cancellation, status changes and queries
pub mod order;
/// Catalog access needed by checkout: prices and stock
pub mod product;
/// Read-side aggregates for the admin dashboard
pub mod report;
