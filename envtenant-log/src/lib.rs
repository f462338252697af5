//! envtenant Logging
//!
//! Installs a `tracing` subscriber configured from the environment and
//! provides the security record used when a request cannot be attributed
//! to a tenant.
//!
//! # Usage
//!
//! ```rust
//! use envtenant_log::{emergency, LogConfig};
//!
//! // Reads ENVTENANT_LOG_LEVEL / ENVTENANT_LOG_FORMAT once.
//! envtenant_log::init();
//!
//! tracing::info!(connection = "mysql", "Default connection captured");
//!
//! let url = "https://unknown.example.com/";
//! emergency!(url = %url, "Tenant could not be resolved");
//! ```
//!
//! # Environment Variables
//!
//! - `ENVTENANT_DEBUG=1` - Enable debug logging
//! - `ENVTENANT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `ENVTENANT_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `ENVTENANT_LOG_COLOR=1|0` - Enable/disable colors
//! - `RUST_LOG` - Full filter directive, overrides the level when set

use once_cell::sync::Lazy;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Target used for security-relevant records.
pub const SECURITY_TARGET: &str = "envtenant::security";

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level for emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    /// Parse a level name. Case-insensitive; `warning` and `none` are accepted.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line, human oriented
    Pretty,
    /// Single-line
    Compact,
    /// One JSON object per record
    Json,
}

impl Format {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Whether to include the record target
    pub targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            targets: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            env::var(name)
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("ENVTENANT_DEBUG").unwrap_or(false);

        let level = env::var("ENVTENANT_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::from_name(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("ENVTENANT_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::from_name(&s))
            .unwrap_or(Format::Json);

        let color = flag("ENVTENANT_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        Self {
            debug,
            level,
            format,
            color,
            targets: true,
        }
    }

    /// Set the minimum level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Filter used when `RUST_LOG` is not set.
    ///
    /// Security records are never filtered out unless logging is off.
    pub fn filter_directive(&self) -> String {
        match self.level {
            Level::Off => "off".to_string(),
            level => format!("{},{}=error", level.as_filter(), SECURITY_TARGET),
        }
    }
}

/// Get the configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Subscriber installation
// ============================================================================

/// Install the global subscriber using the environment configuration.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init() -> bool {
    init_with(config())
}

/// Install the global subscriber with an explicit configuration.
pub fn init_with(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        Format::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.targets)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        Format::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(config.color)
                    .with_target(config.targets)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        Format::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(config.color)
                    .with_target(config.targets)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.is_ok()
}

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}

/// Record an emergency-severity event on the security target.
///
/// Accepts the same field and message syntax as `tracing::error!`.
///
/// ```rust
/// use envtenant_log::emergency;
///
/// let client = "203.0.113.7";
/// emergency!(client_addr = %client, "Tenant not resolved for {}", "ghost.example.com");
/// ```
#[macro_export]
macro_rules! emergency {
    ($($arg:tt)+) => {
        $crate::__private::tracing::error!(
            target: $crate::SECURITY_TARGET,
            severity = "emergency",
            $($arg)+
        )
    };
}
