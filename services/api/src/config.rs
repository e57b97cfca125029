//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_MATCHER_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gemini_api_key: Option<String>,
    pub matcher_model: String,
    pub matcher_api_base: String,
    pub matcher_timeout: Duration,
    pub daily_limit: u32,
    pub min_audio_bytes: usize,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            gemini_api_key: None,
            matcher_model: "gemini-2.5-flash".to_string(),
            matcher_api_base: DEFAULT_MATCHER_API_BASE.to_string(),
            matcher_timeout: Duration::from_secs(60),
            daily_limit: 3,
            min_audio_bytes: 1024,
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origin: "*".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", defaults.bind_address)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        // --- Matcher Settings ---
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty());
        let matcher_model = lookup("MATCHER_MODEL").unwrap_or(defaults.matcher_model);
        let matcher_api_base = lookup("MATCHER_API_BASE").unwrap_or(defaults.matcher_api_base);
        let timeout_secs: u64 = parse_or(&lookup, "MATCHER_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "MATCHER_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // --- Quota and Upload Limits ---
        let daily_limit = parse_or(&lookup, "DAILY_LIMIT", defaults.daily_limit)?;
        let min_audio_bytes = parse_or(&lookup, "MIN_AUDIO_BYTES", defaults.min_audio_bytes)?;
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            matcher_model,
            matcher_api_base,
            matcher_timeout: Duration::from_secs(timeout_secs),
            daily_limit,
            min_audio_bytes,
            max_upload_bytes,
            cors_origin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.daily_limit, 3);
        assert_eq!(config.min_audio_bytes, 1024);
        assert_eq!(config.matcher_timeout, Duration::from_secs(60));
        assert_eq!(config.matcher_api_base, DEFAULT_MATCHER_API_BASE);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("DAILY_LIMIT", "5"),
            ("MATCHER_TIMEOUT_SECS", "15"),
            ("GEMINI_API_KEY", "secret"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.daily_limit, 5);
        assert_eq!(config.matcher_timeout, Duration::from_secs(15));
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[("DAILY_LIMIT", "three")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "DAILY_LIMIT"));

        let err = load(&[("MATCHER_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "MATCHER_TIMEOUT_SECS"));

        assert!(load(&[("RUST_LOG", "chatty")]).is_err());
    }
}
