//! Application settings loading from config.toml with environment overrides.
//!
//! The file is optional: every section has defaults, so a bare checkout runs against a
//! local `SQLite` file on port 8080. `DATABASE_URL` and `PORT` from the environment (or
//! `.env`) take precedence over the file.

use crate::config::coupons::CouponSeed;
use crate::core::order::PricingPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Checkout behaviour
    #[serde(default)]
    pub checkout: CheckoutConfig,
    /// Coupons to create on startup if their code is absent
    #[serde(default)]
    pub coupons: Vec<CouponSeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Checkout behaviour
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CheckoutConfig {
    /// Use the per-item prices submitted by the client instead of catalog prices
    #[serde(default)]
    pub trust_client_prices: bool,
}

impl CheckoutConfig {
    /// Pricing policy order placement should apply
    #[must_use]
    pub const fn pricing_policy(self) -> PricingPolicy {
        if self.trust_client_prices {
            PricingPolicy::Client
        } else {
            PricingPolicy::Catalog
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://storefront.sqlite?mode=rwc".to_string()
}

/// Parses configuration from a TOML string
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or fields have the wrong type
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or parsed
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Applies `DATABASE_URL` and `PORT` environment overrides
///
/// # Errors
/// Returns an error if `PORT` is set but is not a valid port number
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port.parse().map_err(|e| Error::Config {
            message: format!("Invalid PORT '{port}': {e}"),
        })?;
    }
    Ok(())
}

/// Loads the application configuration the binary runs with.
///
/// Reads `CONFIG_PATH` (default `config.toml`) if it exists, falls back to defaults
/// otherwise, then applies environment overrides.
///
/// # Errors
/// Returns an error if an existing config file is invalid or an override is malformed
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!("No config file at {path}, using defaults");
        AppConfig::default()
    };
    apply_env_overrides(&mut config)?;
    info!(
        "Configuration loaded: {} seed coupon(s), pricing policy {:?}",
        config.coupons.len(),
        config.checkout.pricing_policy()
    );
    Ok(config)
}
