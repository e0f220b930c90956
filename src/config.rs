use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;
const DEFAULT_STORE_NAMESPACE: &str = "storefront";

/// Document store gateway configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Key namespace / project identifier handed to the gateway backend.
    #[serde(default = "default_store_namespace")]
    pub namespace: String,

    /// Emit one debug line per store primitive call.
    #[serde(default)]
    pub debug: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_store_namespace(),
            debug: false,
        }
    }
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            event_buffer_size: default_event_buffer_size(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `config/default`, an environment-specific
    /// overlay (`config/{environment}`), and `STOREFRONT_`-prefixed
    /// environment variables, in that precedence order.
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            env::var("STOREFRONT_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config: AppConfig = Config::builder()
            .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
            .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
            .add_source(Environment::with_prefix("STOREFRONT").separator("__"))
            .set_override_option("environment", Some(environment))?
            .build()?
            .try_deserialize()?;

        config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

fn default_store_namespace() -> String {
    DEFAULT_STORE_NAMESPACE.to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level")),
    }
}
