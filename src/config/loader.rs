//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, StrategyError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    // Add default config file if it exists
    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // Add environment variables with APP_ prefix
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| StrategyError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| StrategyError::Configuration(e.to_string()))
}

/// Overlay credentials and endpoints from well-known environment variables.
/// Values already present in the config are only replaced when the variable
/// is set. The caller is expected to have loaded any `.env` file already.
pub fn load_from_env(cfg: &mut AppConfig) {
    if let Ok(key) = std::env::var("BINANCE_API_KEY") {
        cfg.exchange.api_key = Some(key);
    }
    if let Ok(secret) = std::env::var("BINANCE_API_SECRET") {
        cfg.exchange.api_secret = Some(secret);
    }
    if let Ok(url) = std::env::var("BINANCE_FAPI_URL") {
        cfg.exchange.rest_url = url;
    }
    if let Ok(webhook) = std::env::var("NOTIFY_WEBHOOK_URL") {
        cfg.settings.notify_webhook = Some(webhook);
    }
}
