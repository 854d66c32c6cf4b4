//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PAYMONGO_SECRET_KEY` (optional): gateway secret key; without it the mock gateway is used
/// - `PAYMONGO_WEBHOOK_SECRET` (optional): secret used to verify gateway callbacks
/// - `PAYMONGO_API_BASE` (optional): gateway API root
/// - `APP_BASE_URL` (optional): public URL of the registration site, used for checkout redirects
/// - `CORS_ORIGIN` (optional): origin allowed to call the API from a browser
/// - `CONFERENCE_DISCOUNT_CENTS` (optional): bundle discount in centavos
/// - `CHECKOUT_TTL_MINUTES` (optional): lifetime of an unpaid checkout reference
/// - `DRAFT_TTL_DAYS` (optional): how long an untouched form draft is kept
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub paymongo_secret_key: Option<String>,

    #[serde(default)]
    pub paymongo_webhook_secret: Option<String>,

    #[serde(default = "default_paymongo_api_base")]
    pub paymongo_api_base: String,

    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,

    #[serde(default)]
    pub cors_origin: Option<String>,

    #[serde(default = "default_conference_discount_cents")]
    pub conference_discount_cents: i64,

    #[serde(default = "default_checkout_ttl_minutes")]
    pub checkout_ttl_minutes: i64,

    #[serde(default = "default_draft_ttl_days")]
    pub draft_ttl_days: i32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_paymongo_api_base() -> String {
    "https://api.paymongo.com/v1".to_string()
}

fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// ₱1500 expressed in centavos.
fn default_conference_discount_cents() -> i64 {
    150_000
}

/// Hosted checkout pages stay payable for a day.
fn default_checkout_ttl_minutes() -> i64 {
    1440
}

fn default_draft_ttl_days() -> i32 {
    30
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Configuration with every optional value at its default.
    ///
    /// Used by tests, which receive their pool from `#[sqlx::test]` and never
    /// touch the real gateway.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            server_port: default_port(),
            paymongo_secret_key: None,
            paymongo_webhook_secret: None,
            paymongo_api_base: default_paymongo_api_base(),
            app_base_url: default_app_base_url(),
            cors_origin: None,
            conference_discount_cents: default_conference_discount_cents(),
            checkout_ttl_minutes: default_checkout_ttl_minutes(),
            draft_ttl_days: default_draft_ttl_days(),
        }
    }
}
