//! Integration tests for the envtenant CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SETTINGS: &str = r#"
default_connection = "mysql"
base_migrations = "database/migrations"

[connections.mysql]
driver = "mysql"

[connections.mysql_tenant]
driver = "mysql"
"#;

const TENANTS: &str = r#"[
  {"id": 7, "name": "Acme", "subdomain": "acme", "alias_domain": "acme.test", "connection": "mysql_tenant"},
  {"id": 11, "name": "Waiting", "subdomain": "waiting", "connection": "pending"},
  {"id": 9, "name": "Bare", "connection": "mysql_tenant"},
  {"id": 8, "name": "Globex", "subdomain": "globex", "connection": "mysql_tenant"}
]"#;

/// Working directory holding `envtenant.toml` and `tenants.json`
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("envtenant.toml"), SETTINGS).unwrap();
    fs::write(dir.path().join("tenants.json"), TENANTS).unwrap();
    dir
}

#[allow(deprecated)]
fn envtenant(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("envtenant").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ENVTENANT_LOG_LEVEL")
        .env_remove("ENVTENANT_DEFAULT_CONNECTION")
        .env_remove("RUST_LOG")
        .args(["--no-color", "--tenants", "tenants.json"]);
    cmd
}

#[test]
fn test_help_lists_tenant_flag() {
    let dir = project();
    envtenant(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tenant"))
        .stdout(predicate::str::contains("Use * or all for every tenant"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_tenants_lists_status() {
    let dir = project();
    envtenant(&dir)
        .arg("tenants")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme"))
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("4 tenant(s)"));
}

#[test]
fn test_tenants_json() {
    let dir = project();
    let output = envtenant(&dir)
        .args(["tenants", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.as_array().map(Vec::len), Some(4));
    assert_eq!(records[0]["subdomain"], "acme");
}

#[test]
fn test_resolve_host() {
    let dir = project();
    envtenant(&dir)
        .args(["resolve", "acme.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme (id 7)"))
        .stdout(predicate::str::contains("mysql_tenant"))
        .stdout(predicate::str::contains("acme_"));
}

#[test]
fn test_resolve_path_id() {
    let dir = project();
    envtenant(&dir)
        .args(["resolve", "app.example.com", "--path", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bare (id 9)"))
        .stdout(predicate::str::contains("tenant9_"));
}

#[test]
fn test_resolve_unknown_host_fails() {
    let dir = project();
    envtenant(&dir)
        .args(["resolve", "ghost.example.com"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Tenant could not be resolved for ghost.example.com",
        ));
}

#[test]
fn test_status_without_tenant() {
    let dir = project();
    envtenant(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tenant: none"))
        .stdout(predicate::str::contains("Connection: mysql"));
}

#[test]
fn test_table_for_tenant() {
    let dir = project();
    envtenant(&dir)
        .args(["--tenant", "acme.test", "table", "users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running command for Acme"))
        .stdout(predicate::str::contains("acme_users"));
}

#[test]
fn test_unknown_tenant_falls_back_to_base_migrations() {
    let dir = project();
    envtenant(&dir)
        .args(["--tenant", "initech", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to resolve tenant"))
        .stdout(predicate::str::contains("Tenant: none"))
        .stdout(predicate::str::contains("Connection: mysql"))
        .stdout(predicate::str::contains("Migrations: database/migrations"));
}

#[test]
fn test_unknown_tenant_skips_command_without_base_migrations() {
    let dir = project();
    fs::write(
        dir.path().join("plain.toml"),
        "default_connection = \"mysql\"\n[connections.mysql]\n[connections.mysql_tenant]\n",
    )
    .unwrap();

    envtenant(&dir)
        .args(["--config", "plain.toml", "--tenant", "initech", "table", "users"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed to resolve tenant"))
        .stdout(predicate::str::contains("users").not());
}

#[test]
fn test_all_tenants_in_order() {
    let dir = project();
    let output = envtenant(&dir)
        .args(["--tenant", "all", "table", "users"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let tables: Vec<&str> = stdout
        .lines()
        .filter(|line| line.ends_with("_users"))
        .collect();
    assert_eq!(tables, vec!["acme_users", "tenant9_users", "globex_users"]);
    assert!(stdout.contains("Skipping Waiting: tenant is not provisioned"));
}

#[test]
fn test_quiet_hides_progress() {
    let dir = project();
    envtenant(&dir)
        .args(["--quiet", "--tenant", "globex", "table", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("globex_orders"))
        .stdout(predicate::str::contains("Running command").not());
}

#[test]
fn test_invalid_settings_rejected() {
    let dir = project();
    fs::write(
        dir.path().join("broken.toml"),
        "default_connection = \"missing\"\n[connections.mysql]\n",
    )
    .unwrap();

    envtenant(&dir)
        .args(["--config", "broken.toml", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
