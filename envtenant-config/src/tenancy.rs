//! Typed tenancy settings.
//!
//! ```toml
//! default_connection = "landlord"
//! pending_connection = "pending"
//! wildcards = ["*", "all"]
//! base_migrations = "database/migrations"
//! tenants_file = "tenants.json"
//!
//! [connections.landlord]
//! driver = "mysql"
//! database = "landlord"
//!
//! [connections.acme_db]
//! driver = "mysql"
//! database = "acme"
//!
//! [all_tenants]
//! continue_on_error = true
//! ```

use crate::{ConfigLoader, ConfigManager, ConfigValidator, FileFormat, Result, Validate};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "ENVTENANT";

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "envtenant.toml";

/// A named database connection known to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_driver", deserialize_with = "scalar_string")]
    pub driver: String,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub host: Option<String>,
    /// Table prefix applied while this connection has no tenant override
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub prefix: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            database: None,
            host: None,
            prefix: None,
        }
    }
}

/// Batch execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllTenantsConfig {
    /// Leave tenants without a usable connection out of the batch
    pub skip_unprovisioned: bool,
    /// Keep iterating after a tenant's unit of work fails
    pub continue_on_error: bool,
}

impl Default for AllTenantsConfig {
    fn default() -> Self {
        Self {
            skip_unprovisioned: true,
            continue_on_error: false,
        }
    }
}

/// Tenancy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Connection active at process start, the fallback for every unit of work
    #[serde(deserialize_with = "scalar_string")]
    pub default_connection: String,
    /// Connections known to the pool, by name
    pub connections: BTreeMap<String, ConnectionConfig>,
    /// Connection name meaning "not provisioned yet"
    #[serde(deserialize_with = "scalar_string")]
    pub pending_connection: String,
    /// Console tokens meaning "every tenant"
    pub wildcards: Vec<String>,
    /// Migration namespace used when a console tenant cannot be resolved
    #[serde(deserialize_with = "optional_scalar_string")]
    pub base_migrations: Option<String>,
    /// JSON array of tenant records
    #[serde(deserialize_with = "optional_scalar_string")]
    pub tenants_file: Option<PathBuf>,
    /// Inactive tenants resolve as not found
    pub require_active: bool,
    pub all_tenants: AllTenantsConfig,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_connection: "default".to_string(),
            connections: BTreeMap::new(),
            pending_connection: "pending".to_string(),
            wildcards: vec!["*".to_string(), "all".to_string()],
            base_migrations: None,
            tenants_file: None,
            require_active: true,
            all_tenants: AllTenantsConfig::default(),
        }
    }
}

fn default_driver() -> String {
    "mysql".to_string()
}

/// Text field that also accepts the numbers and booleans produced by typing
/// environment values, `ENVTENANT_DEFAULT_CONNECTION=1` included.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

fn optional_scalar_string<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(value)
            .map(|s| Some(T::from(s)))
            .map_err(de::Error::custom),
    }
}

impl Validate for TenancyConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_identifier(&self.default_connection, "default_connection")?;
        ConfigValidator::not_empty(&self.pending_connection, "pending_connection")?;
        ConfigValidator::not_empty_list(&self.wildcards, "wildcards")?;

        for wildcard in &self.wildcards {
            ConfigValidator::not_empty(wildcard, "wildcards")?;
        }

        if !self.connections.is_empty() {
            let names: Vec<&str> = self.connections.keys().map(String::as_str).collect();
            ConfigValidator::one_of(
                &self.default_connection.as_str(),
                &names,
                "default_connection",
            )?;
            for name in self.connections.keys() {
                ConfigValidator::is_identifier(name, "connections")?;
            }
        }

        Ok(())
    }
}

impl TenancyConfig {
    /// Load settings from a file, `.env` and `ENVTENANT_*` variables.
    ///
    /// Without an explicit path `envtenant.toml` is used when it exists;
    /// otherwise defaults plus environment apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let manager = ConfigManager::with_prefix(ENV_PREFIX);
        manager.merge_value(serde_json::to_value(Self::default()).map_err(|e| {
            crate::ConfigError::Parse(e.to_string())
        })?)?;

        match path {
            Some(path) => manager.load_file_auto(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    manager.load_file_auto(fallback)?;
                }
            }
        }

        manager.load_dotenv(None)?;
        manager.load_validated()
    }

    /// Parse settings from a string without consulting the environment.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let value = ConfigLoader::new(format).parse(content)?;
        let config: Self = serde_json::from_value(value)
            .map_err(|e| crate::ConfigError::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Whether `token` selects every tenant. Case-insensitive.
    pub fn is_wildcard(&self, token: &str) -> bool {
        let token = token.trim();
        self.wildcards.iter().any(|w| w.eq_ignore_ascii_case(token))
    }

    /// Table prefix configured for `connection`, if any.
    pub fn connection_prefix(&self, connection: &str) -> Option<&str> {
        self.connections
            .get(connection)
            .and_then(|c| c.prefix.as_deref())
    }
}
