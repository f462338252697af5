// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension
    pub fn auto(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::UnsupportedFormat(ext.to_string()))?;

        Ok(Self::new(format))
    }

    /// Load configuration from file
    pub fn load_file(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Parse(format!("JSON: {}", e))),
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| ConfigError::Parse(format!("TOML: {}", e)))?;
                serde_json::to_value(table).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            FileFormat::Env => Ok(parse_env(content)),
        }
    }
}

fn parse_env(content: &str) -> Value {
    let mut map = serde_json::Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.trim().to_lowercase(), parse_scalar(value));
        }
    }

    Value::Object(map)
}

/// Interpret a raw string as a JSON scalar when it is one (`true`, `42`),
/// otherwise keep it as a string.
pub(crate) fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader
            .parse(r#"{"default_connection": "mysql", "require_active": false}"#)
            .unwrap();
        assert_eq!(result["default_connection"], "mysql");
        assert_eq!(result["require_active"], false);
    }

    #[test]
    fn test_parse_toml_nested_tables() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            default_connection = "mysql"

            [connections.mysql_tenant]
            driver = "mysql"
            database = "tenants"
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["connections"]["mysql_tenant"]["database"], "tenants");
    }

    #[test]
    fn test_parse_env_types_scalars() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = r#"
            DEFAULT_CONNECTION=mysql
            REQUIRE_ACTIVE=false
            # Comment
            PENDING_CONNECTION="pending"
        "#;

        let result = loader.parse(env).unwrap();
        assert_eq!(result["default_connection"], "mysql");
        assert_eq!(result["require_active"], false);
        assert_eq!(result["pending_connection"], "pending");
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("12"), serde_json::json!(12));
        assert_eq!(parse_scalar("mysql"), Value::String("mysql".into()));
        assert_eq!(parse_scalar("[1]"), Value::String("[1]".into()));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("env"), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert!(ConfigLoader::auto(Path::new("envtenant")).is_err());
    }
}
