//! Integration tests for envtenant-config

use envtenant_config::*;
use std::env;
use std::fs;

#[test]
fn test_config_manager_creation() {
    let manager = ConfigManager::new();
    assert!(manager.keys().is_empty());
}

#[test]
fn test_config_manager_with_prefix() {
    let manager = ConfigManager::with_prefix("ETIT_A");

    unsafe {
        env::set_var("ETIT_A_TEST_KEY", "test_value");
        env::set_var("ETIT_A_DB__PORT", "3306");
    }

    manager.load_env().unwrap();
    assert_eq!(manager.get::<String>("test_key").unwrap(), "test_value");
    assert_eq!(manager.get::<serde_json::Value>("db").unwrap()["port"], 3306);

    unsafe {
        env::remove_var("ETIT_A_TEST_KEY");
        env::remove_var("ETIT_A_DB__PORT");
    }
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("ETIT_B".to_string()));

    unsafe {
        env::set_var("ETIT_B_DEFAULT_CONNECTION", "mysql");
    }

    assert_eq!(loader.load_var("DEFAULT_CONNECTION").unwrap(), "mysql");
    assert_eq!(loader.load_var_or("MISSING", "fallback"), "fallback");

    unsafe {
        env::remove_var("ETIT_B_DEFAULT_CONNECTION");
    }
}

#[test]
fn test_env_loader_missing_var() {
    let loader = EnvLoader::new(None);

    let result = loader.load_var("NONEXISTENT_VAR_123456");
    assert!(matches!(result, Err(ConfigError::KeyNotFound(_))));
}

#[test]
fn test_tenancy_config_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("tenancy.toml");
    fs::write(
        &toml_path,
        r#"
default_connection = "mysql"
pending_connection = "awaiting"

[connections.mysql]
[connections.mysql_tenant]
prefix = "t_"

[all_tenants]
continue_on_error = true
"#,
    )
    .unwrap();

    let manager = ConfigManager::new();
    manager.load_file_auto(&toml_path).unwrap();
    let config: TenancyConfig = manager.load_validated().unwrap();

    assert_eq!(config.default_connection, "mysql");
    assert_eq!(config.pending_connection, "awaiting");
    assert_eq!(config.connection_prefix("mysql_tenant"), Some("t_"));
    assert!(config.all_tenants.continue_on_error);
    assert!(config.all_tenants.skip_unprovisioned);
    assert_eq!(config.wildcards, vec!["*", "all"]);
}

#[test]
fn test_tenancy_config_rejects_unknown_default() {
    let err = TenancyConfig::parse(
        r#"{"default_connection": "sqlite", "connections": {"mysql": {}}}"#,
        FileFormat::Json,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("default_connection"));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::KeyNotFound("tenants_file".to_string());
    let display = format!("{}", err);
    assert!(display.contains("tenants_file"));
}
