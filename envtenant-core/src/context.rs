//! Resolution Context
//!
//! The connection state of one unit of work. Every request, console command,
//! or all-tenants iteration owns its own value and passes it down the call
//! chain; data access reads the effective connection and prefix from it.

use crate::connection::ConnectionTarget;
use crate::tenant::Tenant;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Where a unit of work is in the resolution lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Nothing attempted yet, or the attempt was rolled back
    Unresolved,
    /// Lookup in progress
    Resolving,
    /// A tenant is active
    Resolved,
    /// Console: no tenant, running against the default connection
    NotResolved,
    /// HTTP: no tenant, the request must fail
    Rejected,
}

/// Connection state owned by one unit of work
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    id: Uuid,
    fallback_connection: String,
    connection: String,
    prefix: Option<String>,
    active_tenant: Option<Tenant>,
    tenant_attributes: Option<Value>,
    migrations: Option<String>,
    state: ResolutionState,
}

impl ResolutionContext {
    /// Start a unit of work on `default_connection`, which also becomes the
    /// fallback and restore point.
    pub fn new(default_connection: impl Into<String>) -> Self {
        let default_connection = default_connection.into();
        Self {
            id: Uuid::new_v4(),
            connection: default_connection.clone(),
            fallback_connection: default_connection,
            prefix: None,
            active_tenant: None,
            tenant_attributes: None,
            migrations: None,
            state: ResolutionState::Unresolved,
        }
    }

    /// Identifier used as the correlation id of published events
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connection the context started on and returns to
    pub fn fallback_connection(&self) -> &str {
        &self.fallback_connection
    }

    /// Connection queries of this unit of work go to
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Effective table prefix, `None` when tables are unprefixed
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Table name with the effective prefix applied
    ///
    /// ```
    /// use envtenant_core::ResolutionContext;
    ///
    /// let ctx = ResolutionContext::new("mysql");
    /// assert_eq!(ctx.table("users"), "users");
    /// ```
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix.as_deref().unwrap_or(""), name)
    }

    /// Tenant last activated on this context
    pub fn active_tenant(&self) -> Option<&Tenant> {
        self.active_tenant.as_ref()
    }

    /// Attribute snapshot of the last tenant activated on its own connection
    pub fn tenant_attributes(&self) -> Option<&Value> {
        self.tenant_attributes.as_ref()
    }

    /// Migration namespace override, set when a console tenant did not resolve
    pub fn migrations(&self) -> Option<&str> {
        self.migrations.as_deref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Whether a tenant is active
    pub fn is_resolved(&self) -> bool {
        self.state == ResolutionState::Resolved
    }

    /// The ambient configuration view of this context.
    ///
    /// Keys: `database.default`, `database.connections.<name>.prefix` and
    /// `tenant` (the attribute snapshot, or null).
    pub fn ambient(&self) -> Map<String, Value> {
        let mut ambient = Map::new();
        ambient.insert(
            "database.default".to_string(),
            Value::String(self.connection.clone()),
        );
        ambient.insert(
            format!("database.connections.{}.prefix", self.connection),
            Value::String(self.prefix.clone().unwrap_or_default()),
        );
        ambient.insert(
            "tenant".to_string(),
            self.tenant_attributes.clone().unwrap_or(Value::Null),
        );
        ambient
    }

    /// Record an applied target; `tenant` becomes the active tenant when given
    pub(crate) fn commit(&mut self, target: ConnectionTarget, tenant: Option<&Tenant>) {
        if let Some(tenant) = tenant {
            if target.dedicated {
                self.tenant_attributes = Some(tenant.attributes());
            }
            self.active_tenant = Some(tenant.clone());
        }
        self.connection = target.connection;
        self.prefix = target.prefix;
    }

    pub(crate) fn clear_tenant(&mut self) {
        self.active_tenant = None;
        self.tenant_attributes = None;
    }

    pub(crate) fn set_state(&mut self, state: ResolutionState) {
        self.state = state;
    }

    pub(crate) fn set_migrations(&mut self, migrations: Option<String>) {
        self.migrations = migrations;
    }
}
