use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Checkout policy knobs. These drive the pricing engine, the cancellation
/// window guards, the return window, and the loyalty cycle. Money values are
/// INR.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutPolicy {
    /// Subtotal at or above which shipping is free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee below the threshold
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: Decimal,

    /// Flat tax rate applied to the discounted base (e.g. 0.05 for 5%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    /// ISO currency code reported to the payment gateway
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Cancellation window for paid orders, anchored at order creation
    #[serde(default = "default_paid_cancellation_window_secs")]
    pub paid_cancellation_window_secs: u64,

    /// Cancellation window for unpaid orders, anchored at order creation
    #[serde(default = "default_unpaid_cancellation_window_secs")]
    pub unpaid_cancellation_window_secs: u64,

    /// Return window after delivery, in days
    #[serde(default = "default_return_window_days")]
    pub return_window_days: u32,

    /// Stamps required to complete a loyalty cycle
    #[serde(default = "default_loyalty_cycle_stamps")]
    pub loyalty_cycle_stamps: i32,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            shipping_fee: default_shipping_fee(),
            tax_rate: default_tax_rate(),
            currency: default_currency(),
            paid_cancellation_window_secs: default_paid_cancellation_window_secs(),
            unpaid_cancellation_window_secs: default_unpaid_cancellation_window_secs(),
            return_window_days: default_return_window_days(),
            loyalty_cycle_stamps: default_loyalty_cycle_stamps(),
        }
    }
}

/// Payment gateway connection settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway REST base URL; when unset the deterministic local gateway is
    /// used (development and tests)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Publishable key handed to the storefront checkout widget
    #[serde(default = "default_gateway_key_id")]
    pub key_id: String,

    /// Secret used to sign and verify payment receipts
    #[validate(length(min = 16))]
    #[serde(default = "default_gateway_key_secret")]
    pub key_secret: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            key_id: default_gateway_key_id(),
            key_secret: default_gateway_key_secret(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Checkout policy
    #[serde(default)]
    #[validate]
    pub policy: CheckoutPolicy,

    /// Payment gateway
    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,

    /// Inventory service base URL; unset selects the in-memory client
    #[serde(default)]
    pub inventory_service_url: Option<String>,

    /// Notification service base URL; unset logs notifications instead
    #[serde(default)]
    pub notification_service_url: Option<String>,
}

impl AppConfig {
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Constraints that span multiple fields and cannot be expressed as
    /// per-field validators.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationError> {
        if !self.is_development() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            return Err(ValidationError::new(
                "cors_allowed_origins must be set outside development (or cors_allow_any_origin explicitly enabled)",
            ));
        }
        if self.is_production() && self.jwt_secret == DEV_DEFAULT_JWT_SECRET {
            return Err(ValidationError::new(
                "the development JWT secret must not be used in production",
            ));
        }
        if self.is_production() && self.gateway.base_url.is_none() {
            return Err(ValidationError::new(
                "gateway.base_url must be configured in production",
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_db_max_connections() -> u32 {
    20
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_event_channel_capacity() -> usize {
    1024
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::new(599, 0)
}
fn default_shipping_fee() -> Decimal {
    Decimal::new(49, 0)
}
fn default_tax_rate() -> Decimal {
    // 5% flat rate
    Decimal::new(5, 2)
}
fn default_currency() -> String {
    "INR".to_string()
}
fn default_paid_cancellation_window_secs() -> u64 {
    3_600
}
fn default_unpaid_cancellation_window_secs() -> u64 {
    86_400
}
fn default_return_window_days() -> u32 {
    7
}
fn default_loyalty_cycle_stamps() -> i32 {
    10
}
fn default_gateway_key_id() -> String {
    "tl_test_key".to_string()
}
fn default_gateway_key_secret() -> String {
    "tl_test_secret_0123456789abcdef".to_string()
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate >= Decimal::ONE {
        return Err(ValidationError::new("tax_rate must be within [0, 1)"));
    }
    Ok(())
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let lowered = secret.to_lowercase();
    if lowered.contains("changeme") || lowered.contains("secret123") {
        return Err(ValidationError::new("jwt_secret looks like a placeholder"));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration constraint violated: {0}")]
    Constraint(#[from] ValidationError),
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default. It MUST arrive via config file or
    // environment so an insecure placeholder never reaches production.
    let config = Config::builder()
        .set_default("database_url", "sqlite://threadline.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a secure random string (minimum 64 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint check failed: {:?}", e);
        AppConfigError::Constraint(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
