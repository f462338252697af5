// Environment variable loading

use crate::loader::parse_scalar;
use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

/// Separator marking a nested key, `ENVTENANT_ALL_TENANTS__CONTINUE_ON_ERROR`
/// becomes `all_tenants.continue_on_error`.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load every matching variable, keyed by its lower-cased name with the
    /// prefix removed. Values are typed with [`parse_scalar`]. Variables whose
    /// name or value is not valid UTF-8 are skipped.
    pub fn load(&self) -> Result<HashMap<String, Value>> {
        Ok(self.collect(utf8_only(env::vars_os())))
    }

    fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, Value> {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = match &self.prefix {
                Some(prefix) => match key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                {
                    Some(rest) if !rest.is_empty() => rest.to_string(),
                    _ => continue,
                },
                None => key,
            };
            config.insert(key.to_lowercase(), parse_scalar(&value));
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        env::var(&full_key).map_err(|_| ConfigError::KeyNotFound(full_key))
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

fn utf8_only(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
