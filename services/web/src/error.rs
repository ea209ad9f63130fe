//! services/web/src/error.rs
//!
//! Defines the primary error type for the web service.

use crate::config::ConfigError;

/// The errors that can stop the `web` service from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
