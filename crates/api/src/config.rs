//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BIKA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `BIKA_HOST` - Bind address (default: 127.0.0.1)
//! - `BIKA_PORT` - Listen port (default: 8000)
//! - `BIKA_IDENTITY_HEADER` - Header carrying the authenticated user id
//!   (default: x-authenticated-user)
//! - `BIKA_PAYMENT_TIMEOUT_SECS` - Payment gateway timeout (default: 10)
//! - `BIKA_DEFAULT_CURRENCY` - Currency when checkout omits one (default: RWF)
//! - `BIKA_ORDER_NUMBER_ATTEMPTS` - Order number collision retries (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;
use secrecy::SecretString;
use thiserror::Error;

use bika_core::CurrencyCode;

pub const DEFAULT_IDENTITY_HEADER: &str = "x-authenticated-user";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Trusted header set by the authentication proxy
    pub identity_header: HeaderName,
    /// Checkout tuning
    pub checkout: CheckoutSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Settings for the checkout orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// How long to wait for the payment gateway before aborting.
    pub payment_timeout: Duration,
    /// Currency used when the request omits one.
    pub default_currency: CurrencyCode,
    /// Fresh order numbers to try before giving up on collisions.
    pub order_number_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(10),
            default_currency: CurrencyCode::RWF,
            order_number_attempts: 5,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BIKA_DATABASE_URL")?;
        let host = parse_env("BIKA_HOST", "127.0.0.1")?;
        let port = parse_env("BIKA_PORT", "8000")?;
        let identity_header = parse_env("BIKA_IDENTITY_HEADER", DEFAULT_IDENTITY_HEADER)?;
        let checkout = CheckoutSettings::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            identity_header,
            checkout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for tests and embedded use: no database URL, defaults everywhere.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            database_url: SecretString::from(String::new()),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
            checkout: CheckoutSettings::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CheckoutSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = parse_env("BIKA_PAYMENT_TIMEOUT_SECS", "10")?;
        let attempts: u32 = parse_env("BIKA_ORDER_NUMBER_ATTEMPTS", "5")?;
        if attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BIKA_ORDER_NUMBER_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            payment_timeout: Duration::from_secs(timeout_secs),
            default_currency: parse_env("BIKA_DEFAULT_CURRENCY", "RWF")?,
            order_number_attempts: attempts,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
