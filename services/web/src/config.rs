//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How long each simulated step takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delays {
    pub upload: Duration,
    pub reply: Duration,
    pub render: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            upload: Duration::from_millis(2000),
            reply: Duration::from_millis(1000),
            render: Duration::from_millis(1500),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub preferences_path: PathBuf,
    pub allowed_origin: String,
    pub delays: Delays,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Preference Storage ---
        let preferences_path = lookup("PREFERENCES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/preferences.json"));

        // --- Simulated Delays ---
        let defaults = Delays::default();
        let delays = Delays {
            upload: millis(&lookup, "UPLOAD_DELAY_MS", defaults.upload)?,
            reply: millis(&lookup, "REPLY_DELAY_MS", defaults.reply)?,
            render: millis(&lookup, "RENDER_DELAY_MS", defaults.render)?,
        };

        Ok(Self {
            bind_address,
            log_level,
            preferences_path,
            allowed_origin,
            delays,
        })
    }
}

fn millis<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
