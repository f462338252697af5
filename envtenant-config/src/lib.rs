//! Configuration layer for envtenant.
//!
//! Values are collected into a [`ConfigManager`] from a configuration file,
//! an optional `.env` file and `ENVTENANT_*` environment variables, in that
//! order of precedence (later sources win), and then deserialized into a
//! typed, validated struct such as [`TenancyConfig`].

pub mod env;
pub mod error;
pub mod loader;
pub mod tenancy;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use tenancy::{AllTenantsConfig, ConnectionConfig, ENV_PREFIX, TenancyConfig};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Layered key/value configuration store
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager that only reads environment variables starting with `prefix_`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Keys containing `__` are written into nested objects.
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in env_vars {
            let path: Vec<&str> = key.split(env::NESTING_SEPARATOR).collect();
            insert_path(&mut config, &path, value);
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then read the
    /// environment. Without a path a missing `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path)?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Load a configuration file with an explicit format
    pub fn load_file(&self, path: &Path, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)
    }

    /// Load a configuration file, detecting the format from its extension
    pub fn load_file_auto(&self, path: &Path) -> Result<()> {
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data)
    }

    /// Merge the top-level keys of a JSON object
    pub fn merge_value(&self, data: Value) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(ConfigError::Parse(
                "configuration root must be a table/object".to_string(),
            ));
        };

        let mut config = self.config.write();
        for (key, value) in map {
            config.insert(key, value);
        }

        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;

        self.config.write().insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let config = self.config.read();

        let value = config
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Deserialization(format!("{}: {}", key, e)))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every value of `other` into this manager, overriding existing keys
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        let other_config = other.config.read().clone();
        let mut config = self.config.write();

        for (key, value) in other_config {
            config.insert(key, value);
        }

        Ok(())
    }

    /// Deserialize everything into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = Value::Object(
            self.config
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T = serde_json::from_value(json_value)
            .map_err(|e| ConfigError::Deserialization(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

fn insert_path(config: &mut HashMap<String, Value>, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        config.insert(first.to_string(), value);
        return;
    }

    let entry = config
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    insert_nested(entry, rest, value);
}

fn insert_nested(target: &mut Value, path: &[&str], value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    match path {
        [] => {}
        [last] => {
            map.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            insert_nested(entry, rest, value);
        }
    }
}
