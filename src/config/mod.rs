//! Application configuration.
//!
//! Type-safe configuration loaded from flat environment variables using
//! the `config` and `dotenvy` crates. Variable names are the upper-case
//! forms of the field names (`DEFAULT_BETA`, `MIN_RESPONSE_DELAY_MS`,
//! `REDIS_URL`, ...). Configuration is an immutable value constructed at
//! boot and passed down; nothing reads the environment after startup.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application environment.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    // Server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    // Negotiation defaults
    #[serde(default = "default_beta")]
    pub default_beta: f64,
    #[serde(default = "default_alpha")]
    pub default_alpha: f64,
    #[serde(default = "default_max_rounds")]
    pub default_max_rounds: u32,
    #[serde(default = "default_session_ttl")]
    pub default_session_ttl_seconds: u64,
    #[serde(default = "default_quote_ttl")]
    pub quote_ttl_seconds: u64,
    #[serde(default = "default_epsilon_pct")]
    pub zopa_epsilon_pct: f64,

    // Security
    #[serde(default = "default_cooldown_ms")]
    pub min_response_delay_ms: u64,
    #[serde(default = "default_start_rate")]
    pub start_rate_limit_per_min: u64,
    #[serde(default)]
    pub api_admin_key: Option<String>,
    #[serde(default = "default_quote_key")]
    pub quote_signing_key: String,

    // Stores
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_lock_lease")]
    pub lock_lease_seconds: u64,
    #[serde(default = "default_hot_timeout_ms")]
    pub hot_op_timeout_ms: u64,
    #[serde(default = "default_durable_timeout_ms")]
    pub durable_op_timeout_ms: u64,

    // LLM
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_seconds: u64,
}

impl AppConfig {
    /// Loads configuration from the process environment, reading a `.env`
    /// file first in development.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: AppConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("PORT must be non-zero".into()));
        }
        if self.default_beta <= 0.0 {
            return Err(ConfigError::Invalid("DEFAULT_BETA must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.default_alpha) {
            return Err(ConfigError::Invalid(
                "DEFAULT_ALPHA must be in [0, 1]".into(),
            ));
        }
        if self.default_max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "DEFAULT_MAX_ROUNDS must be at least 1".into(),
            ));
        }
        if !(0.0..0.5).contains(&self.zopa_epsilon_pct) {
            return Err(ConfigError::Invalid(
                "ZOPA_EPSILON_PCT must be in [0, 0.5)".into(),
            ));
        }
        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(ConfigError::Invalid(
                "REDIS_URL must be a redis:// or rediss:// URL".into(),
            ));
        }
        if self.is_production() {
            if self.api_admin_key.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::Invalid(
                    "API_ADMIN_KEY is required in production".into(),
                ));
            }
            if self.quote_signing_key == default_quote_key() {
                return Err(ConfigError::Invalid(
                    "QUOTE_SIGNING_KEY must be set in production".into(),
                ));
            }
        }
        Ok(())
    }

    /// Check if running in production environment.
    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }

    /// CORS origins as a list.
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_ref()
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_default()
    }

    /// Hot-tier per-operation deadline.
    pub fn hot_op_timeout(&self) -> Duration {
        Duration::from_millis(self.hot_op_timeout_ms)
    }

    /// Durable-tier per-operation deadline.
    pub fn durable_op_timeout(&self) -> Duration {
        Duration::from_millis(self.durable_op_timeout_ms)
    }

    /// Session lifetime in the hot tier.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.default_session_ttl_seconds)
    }

    /// Per-session lock lease.
    pub fn lock_lease(&self) -> Duration {
        Duration::from_secs(self.lock_lease_seconds)
    }

    /// Anti-bot cooldown between offers.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.min_response_delay_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            env: Environment::Development,
            cors_allowed_origins: None,
            default_beta: default_beta(),
            default_alpha: default_alpha(),
            default_max_rounds: default_max_rounds(),
            default_session_ttl_seconds: default_session_ttl(),
            quote_ttl_seconds: default_quote_ttl(),
            zopa_epsilon_pct: default_epsilon_pct(),
            min_response_delay_ms: default_cooldown_ms(),
            start_rate_limit_per_min: default_start_rate(),
            api_admin_key: None,
            quote_signing_key: default_quote_key(),
            redis_url: default_redis_url(),
            database_url: default_database_url(),
            lock_lease_seconds: default_lock_lease(),
            hot_op_timeout_ms: default_hot_timeout_ms(),
            durable_op_timeout_ms: default_durable_timeout_ms(),
            llm_api_key: None,
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            llm_timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_beta() -> f64 {
    5.0
}

fn default_alpha() -> f64 {
    0.6
}

fn default_max_rounds() -> u32 {
    15
}

fn default_session_ttl() -> u64 {
    300
}

fn default_quote_ttl() -> u64 {
    60
}

fn default_epsilon_pct() -> f64 {
    0.01
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_start_rate() -> u64 {
    30
}

fn default_quote_key() -> String {
    "dev-quote-signing-key".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_database_url() -> String {
    "postgresql://localhost/mol_bhav".to_string()
}

fn default_lock_lease() -> u64 {
    5
}

fn default_hot_timeout_ms() -> u64 {
    150
}

fn default_durable_timeout_ms() -> u64 {
    500
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout() -> u64 {
    8
}
