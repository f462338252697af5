//! Error types for the envtenant CLI.

use envtenant_config::ConfigError;
use envtenant_core::TenantError;
use std::fmt;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug)]
pub enum CliError {
    /// Settings could not be loaded or are invalid
    Config(String),

    /// Tenant resolution or a command run under a tenant failed
    Tenant(TenantError),

    /// Output could not be rendered
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Tenant(e) => write!(f, "{}", e),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Tenant(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<TenantError> for CliError {
    fn from(e: TenantError) -> Self {
        match e {
            TenantError::Config(e) => CliError::Config(e.to_string()),
            e => CliError::Tenant(e),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
