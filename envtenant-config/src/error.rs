//! Configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to read {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Configuration value has the wrong shape: {0}")]
    Deserialization(String),

    #[error("Failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
