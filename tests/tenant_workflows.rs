//! Integration tests for common envtenant workflows.
//!
//! These tests drive the public API end to end: settings, directory,
//! lifecycle, boundaries and the all-tenants runner.

use async_trait::async_trait;
use envtenant::prelude::*;
use envtenant::{ConnectionRegistry, ResolutionState, TenantNotResolved, TenantProgress};
use envtenant_config::FileFormat;
use envtenant_events::EventBus;
use parking_lot::Mutex;
use std::sync::Arc;

const SETTINGS: &str = r#"
default_connection = "mysql"
base_migrations = "database/migrations"

[connections.mysql]
driver = "mysql"

[connections.mysql_tenant]
driver = "mysql"
"#;

const TENANTS: &str = r#"[
  {"id": 7, "name": "Acme", "subdomain": "Acme", "alias_domain": "acme.test", "connection": "mysql_tenant"},
  {"id": 11, "name": "Waiting", "subdomain": "waiting", "connection": "pending"},
  {"id": 9, "name": "Bare", "connection": "mysql_tenant"},
  {"id": 8, "name": "Globex", "subdomain": "globex", "connection": "mysql_tenant"},
  {"id": 12, "name": "Closed", "subdomain": "closed", "connection": "mysql_tenant", "is_active": false}
]"#;

fn settings() -> TenancyConfig {
    TenancyConfig::parse(SETTINGS, FileFormat::Toml).unwrap()
}

/// Lifecycle over its own connection registry, as one per unit of work
fn lifecycle(bus: EventBus) -> TenantLifecycle {
    let settings = settings();
    TenantLifecycle::builder()
        .directory(Arc::new(InMemoryTenantDirectory::from_json_str(TENANTS).unwrap()))
        .pool(Arc::new(ConnectionRegistry::from_config(&settings)))
        .bus(bus)
        .settings(settings)
        .build()
        .unwrap()
}

// =============================================================================
// HTTP Workflows
// =============================================================================

#[tokio::test]
async fn test_request_resolves_by_subdomain() {
    let lifecycle = lifecycle(EventBus::new());
    let mut ctx = lifecycle.context();
    let request = http::Request::builder()
        .uri("/dashboard")
        .header("host", "ACME.example.com:443")
        .body(())
        .unwrap();

    let tenant = resolve_request(&lifecycle, &mut ctx, RequestSource::from_request(&request))
        .await
        .unwrap();

    assert_eq!(tenant.name, "Acme");
    assert_eq!(ctx.connection(), "mysql_tenant");
    assert_eq!(ctx.table("invoices"), "acme_invoices");
    assert_eq!(ctx.ambient()["tenant"]["subdomain"], "acme");
}

#[tokio::test]
async fn test_inactive_and_pending_tenants_are_rejected() {
    let lifecycle = lifecycle(EventBus::new());

    for host in ["closed.example.com", "waiting.example.com"] {
        let mut ctx = lifecycle.context();
        let err = resolve_request(&lifecycle, &mut ctx, RequestSource::new(host))
            .await
            .unwrap_err();

        assert!(matches!(err, TenantError::NotResolved(_)));
        assert_eq!(ctx.state(), ResolutionState::Rejected);
        assert_eq!(ctx.connection(), "mysql");
    }
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_context() {
    let acme = lifecycle(EventBus::new());
    let globex = lifecycle(EventBus::new());

    let (a, g) = tokio::join!(
        async {
            let mut ctx = acme.context();
            resolve_request(&acme, &mut ctx, RequestSource::new("acme.example.com"))
                .await
                .map(|_| ctx)
        },
        async {
            let mut ctx = globex.context();
            resolve_request(&globex, &mut ctx, RequestSource::new("globex.example.com"))
                .await
                .map(|_| ctx)
        },
    );

    assert_eq!(a.unwrap().table("users"), "acme_users");
    assert_eq!(g.unwrap().table("users"), "globex_users");
}

#[tokio::test]
async fn test_not_resolved_event_carries_key() {
    let bus = EventBus::new();
    let keys = Arc::new(Mutex::new(Vec::new()));
    let k = keys.clone();
    bus.on(move |event: &TenantNotResolved| {
        k.lock().push(event.key.clone());
        Ok(())
    });
    let lifecycle = lifecycle(bus);
    let mut ctx = lifecycle.context();

    let _ = resolve_request(&lifecycle, &mut ctx, RequestSource::new("ghost.example.com")).await;

    assert_eq!(*keys.lock(), vec!["ghost.example.com".to_string()]);
}

// =============================================================================
// Console Workflows
// =============================================================================

struct Tables(Mutex<Vec<String>>);

#[async_trait]
impl UnitOfWork for Tables {
    async fn run(&self, ctx: &ResolutionContext) -> std::result::Result<i32, BoxError> {
        self.0.lock().push(ctx.table("users"));
        Ok(0)
    }
}

/// Records the connection and migration path it runs against
struct Migrations(Arc<Mutex<Vec<(String, Option<String>)>>>);

#[async_trait]
impl UnitOfWork for Migrations {
    async fn run(&self, ctx: &ResolutionContext) -> std::result::Result<i32, BoxError> {
        self.0
            .lock()
            .push((ctx.connection().to_string(), ctx.migrations().map(String::from)));
        Ok(0)
    }
}

#[tokio::test]
async fn test_console_all_tenants() {
    let bus = EventBus::new();
    let progress = Arc::new(Mutex::new(Vec::new()));
    let p = progress.clone();
    bus.on(move |event: &TenantProgress| {
        p.lock().push(event.message.clone());
        Ok(())
    });
    let lifecycle = lifecycle(bus);
    let work = Tables(Mutex::new(Vec::new()));
    let mut ctx = lifecycle.context();

    let code = ConsoleSession::new(&lifecycle, Some("*"))
        .run(&mut ctx, &work)
        .await
        .unwrap();

    assert_eq!(code, 0);
    // Inactive tenants are still listed by the directory and run in batches.
    assert_eq!(
        *work.0.lock(),
        vec!["acme_users", "tenant9_users", "globex_users", "closed_users"]
    );
    assert!(
        progress
            .lock()
            .contains(&"Skipping Waiting: tenant is not provisioned".to_string())
    );
}

#[tokio::test]
async fn test_console_unknown_tenant_uses_base_migrations() {
    let bus = EventBus::new();
    let progress = Arc::new(Mutex::new(Vec::new()));
    let p = progress.clone();
    bus.on(move |event: &TenantProgress| {
        p.lock().push(event.message.clone());
        Ok(())
    });
    let lifecycle = lifecycle(bus);
    let migrations = Arc::new(Mutex::new(Vec::new()));
    let work = Migrations(migrations.clone());
    let mut ctx = lifecycle.context();

    let code = ConsoleSession::new(&lifecycle, Some("initech"))
        .run(&mut ctx, &work)
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(
        *migrations.lock(),
        vec![("mysql".to_string(), Some("database/migrations".to_string()))]
    );
    assert_eq!(*progress.lock(), vec!["Failed to resolve tenant".to_string()]);
}

#[tokio::test]
async fn test_reconnect_round_trip() {
    let lifecycle = lifecycle(EventBus::new());
    let mut ctx = lifecycle.context();
    lifecycle
        .resolve(&mut ctx, &ResolutionSource::console(Some("globex")))
        .await
        .unwrap();

    lifecycle.reconnect_default_connection(&mut ctx).await.unwrap();
    assert_eq!(ctx.connection(), "mysql");
    assert_eq!(ctx.prefix(), None);

    lifecycle.reconnect_tenant_connection(&mut ctx).await.unwrap();
    assert_eq!(ctx.connection(), "mysql_tenant");
    assert_eq!(ctx.prefix(), Some("globex_"));
}

#[test]
fn test_tenants_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenants.json");
    std::fs::write(&path, TENANTS).unwrap();

    let directory = InMemoryTenantDirectory::from_json_file(&path).unwrap();
    assert_eq!(directory.len(), 5);
}
