/// Database connection and schema creation
pub mod database;

/// Application settings loaded from config.toml and the environment
pub mod settings;

/// Sample coupon definitions seeded on startup
pub mod coupons;

pub use settings::{AppConfig, load_app_configuration};
