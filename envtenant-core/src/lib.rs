//! Tenant resolution for envtenant
//!
//! Resolves the tenant that owns an HTTP request or console command and
//! points that unit of work at the tenant's database connection and table
//! prefix.
//!
//! # Features
//!
//! - **Tenant Directory** - Look tenants up by subdomain, alias domain or id
//! - **Identity Resolver** - Derive the tenant from a host, path or `--tenant` token
//! - **Connection Switch** - Swap the default connection and prefix per tenant
//! - **Resolution Context** - Per-unit-of-work connection state, passed explicitly
//! - **All-Tenants Runner** - Run a command once per tenant, in order
//!
//! # Quick Start
//!
//! ```rust
//! use envtenant_core::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let directory = InMemoryTenantDirectory::from_json_str(
//!     r#"[{"id": 7, "name": "Acme", "subdomain": "acme", "connection": "mysql_tenant"}]"#,
//! )?;
//!
//! let mut settings = TenancyConfig::default();
//! settings.default_connection = "mysql".to_string();
//! let pool = ConnectionRegistry::new("mysql", [("mysql_tenant".to_string(), Default::default())]);
//!
//! let lifecycle = TenantLifecycle::builder()
//!     .directory(Arc::new(directory))
//!     .pool(Arc::new(pool))
//!     .settings(settings)
//!     .build()?;
//!
//! let mut ctx = lifecycle.context();
//! let tenant = resolve_request(&lifecycle, &mut ctx, RequestSource::new("acme.example.com")).await?;
//!
//! assert_eq!(tenant.id, 7);
//! assert_eq!(ctx.table("orders"), "acme_orders");
//! # Ok::<(), TenantError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]

pub mod connection;
pub mod console;
pub mod context;
pub mod directory;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod request;
pub mod resolver;
pub mod runner;
pub mod tenant;

pub use connection::{
    ConnectionHandle, ConnectionPool, ConnectionRegistry, ConnectionSwitch, ConnectionTarget,
    PREFIX_PARAMETER,
};
pub use console::{ConsoleSession, NOT_RESOLVED_EXIT_CODE, TENANT_FLAG_HELP, TenantToken};
pub use context::{ResolutionContext, ResolutionState};
pub use directory::{InMemoryTenantDirectory, TenantDirectory};
pub use error::{BoxError, Result, TenantError};
pub use events::{ProgressLevel, TenantActivated, TenantNotResolved, TenantProgress, TenantResolved};
pub use lifecycle::{Resolution, TenantLifecycle, TenantLifecycleBuilder};
pub use request::resolve_request;
pub use resolver::{IdentityResolver, RequestSource, ResolutionSource, subdomain_label};
pub use runner::{AllTenantsRunner, FailurePolicy, RunReport, TenantFailure, UnitOfWork};
pub use tenant::{Tenant, normalize_domain};

pub use envtenant_config::TenancyConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::{ConnectionPool, ConnectionRegistry};
    pub use crate::console::{ConsoleSession, TenantToken};
    pub use crate::context::{ResolutionContext, ResolutionState};
    pub use crate::directory::{InMemoryTenantDirectory, TenantDirectory};
    pub use crate::error::{BoxError, TenantError};
    pub use crate::events::{ProgressLevel, TenantActivated, TenantProgress, TenantResolved};
    pub use crate::lifecycle::{Resolution, TenantLifecycle};
    pub use crate::request::resolve_request;
    pub use crate::resolver::{RequestSource, ResolutionSource};
    pub use crate::runner::{AllTenantsRunner, FailurePolicy, UnitOfWork};
    pub use crate::tenant::Tenant;
    pub use envtenant_config::TenancyConfig;
}
