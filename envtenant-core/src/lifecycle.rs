//! Resolution Lifecycle
//!
//! Orchestrates the identity resolver and the connection switch for one unit
//! of work and announces the outcome on the event bus.
//!
//! ```rust
//! use envtenant_core::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let directory = InMemoryTenantDirectory::with_tenants([
//!     Tenant::new(7, "Acme").with_subdomain("acme").with_connection("mysql_tenant"),
//! ])?;
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
//! let source = ResolutionSource::Http(RequestSource::new("acme.example.com"));
//! let resolution = lifecycle.resolve(&mut ctx, &source).await?;
//!
//! assert!(resolution.is_resolved());
//! assert_eq!(ctx.connection(), "mysql_tenant");
//! assert_eq!(ctx.table("users"), "acme_users");
//! # Ok::<(), TenantError>(())
//! # }).unwrap();
//! ```

use crate::connection::{ConnectionPool, ConnectionSwitch};
use crate::context::{ResolutionContext, ResolutionState};
use crate::directory::TenantDirectory;
use crate::error::{Result, TenantError};
use crate::events::{ProgressLevel, TenantActivated, TenantNotResolved, TenantProgress, TenantResolved};
use crate::resolver::{IdentityResolver, ResolutionSource};
use crate::tenant::Tenant;
use envtenant_config::TenancyConfig;
use envtenant_events::EventBus;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of [`TenantLifecycle::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The tenant was found and activated
    Resolved(Tenant),
    /// No activatable tenant matched `key`
    NotResolved {
        /// Host, or console token, the lookup used
        key: String,
    },
    /// Console without a tenant token, or with a wildcard: nothing to resolve
    Unscoped,
}

impl Resolution {
    /// Whether a tenant was activated
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// The activated tenant, if any
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            Resolution::Resolved(tenant) => Some(tenant),
            _ => None,
        }
    }
}

/// Resolves and activates tenants for units of work
#[derive(Clone)]
pub struct TenantLifecycle {
    resolver: IdentityResolver,
    switch: ConnectionSwitch,
    bus: EventBus,
    settings: Arc<TenancyConfig>,
}

impl TenantLifecycle {
    /// Start building a lifecycle
    pub fn builder() -> TenantLifecycleBuilder {
        TenantLifecycleBuilder::default()
    }

    /// Tenancy settings in effect
    pub fn settings(&self) -> &TenancyConfig {
        &self.settings
    }

    /// Bus tenant events are published on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Directory tenants are looked up in
    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        self.resolver.directory()
    }

    /// Resolver used for lookups
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Fresh context on the configured default connection
    pub fn context(&self) -> ResolutionContext {
        ResolutionContext::new(self.settings.default_connection.clone())
    }

    /// Resolve `source` and, on success, activate the tenant.
    ///
    /// Not finding a tenant is a [`Resolution::NotResolved`], not an error;
    /// the caller decides whether that is fatal.
    pub async fn resolve(
        &self,
        ctx: &mut ResolutionContext,
        source: &ResolutionSource,
    ) -> Result<Resolution> {
        if let ResolutionSource::Console { token } = source {
            let scoped = token
                .as_deref()
                .map(str::trim)
                .is_some_and(|t| !t.is_empty() && !self.settings.is_wildcard(t));
            if !scoped {
                return Ok(Resolution::Unscoped);
            }
        }

        ctx.set_state(ResolutionState::Resolving);

        let outcome = self.resolve_inner(ctx, source).await;
        if outcome.is_err() {
            ctx.set_state(if source.is_console() {
                ResolutionState::Unresolved
            } else {
                ResolutionState::Rejected
            });
        }
        outcome
    }

    async fn resolve_inner(
        &self,
        ctx: &mut ResolutionContext,
        source: &ResolutionSource,
    ) -> Result<Resolution> {
        let found = match self.resolver.resolve(source).await {
            Ok(found) => found,
            Err(e) if source.is_console() => {
                warn!(error = %e, "Tenant lookup failed, continuing without a tenant");
                None
            }
            Err(e) => return Err(e),
        };

        match found {
            Some(tenant) => {
                self.activate(ctx, &tenant).await?;

                if let Err(e) = self.bus.publish(TenantResolved::new(ctx, &tenant)).await {
                    self.abort(ctx).await;
                    return Err(e.into());
                }

                info!(tenant_id = tenant.id, connection = %ctx.connection(), "Tenant resolved");
                Ok(Resolution::Resolved(tenant))
            }
            None => {
                let key = self.resolver.lookup_key(source);
                if source.is_console() {
                    ctx.set_state(ResolutionState::NotResolved);
                    ctx.set_migrations(self.settings.base_migrations.clone());
                } else {
                    ctx.set_state(ResolutionState::Rejected);
                }
                debug!(key = %key, "Tenant not resolved");

                self.bus.publish(TenantNotResolved::new(ctx, key.clone())).await?;
                Ok(Resolution::NotResolved { key })
            }
        }
    }

    /// Switch `ctx` to `tenant` and publish [`TenantActivated`].
    ///
    /// Unprovisioned tenants are refused with [`TenantError::NotFound`],
    /// matching how the resolver treats them. If a subscriber rejects the
    /// activation, `ctx` is returned to the fallback connection.
    pub async fn activate(&self, ctx: &mut ResolutionContext, tenant: &Tenant) -> Result<()> {
        if !tenant.is_provisioned(&self.settings.pending_connection) {
            return Err(TenantError::NotFound(format!(
                "tenant {} is not provisioned",
                tenant.id
            )));
        }

        self.switch.activate(ctx, tenant).await?;
        ctx.set_state(ResolutionState::Resolved);

        if let Err(e) = self.bus.publish(TenantActivated::new(ctx, tenant)).await {
            self.abort(ctx).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// Point `ctx` back at the fallback connection; the active tenant is kept
    pub async fn reconnect_default_connection(&self, ctx: &mut ResolutionContext) -> Result<()> {
        self.switch.reset(ctx).await.map(|_| ())
    }

    /// Re-apply the active tenant's connection. No-op without an active tenant.
    pub async fn reconnect_tenant_connection(&self, ctx: &mut ResolutionContext) -> Result<()> {
        match ctx.active_tenant().cloned() {
            Some(tenant) => self.switch.activate(ctx, &tenant).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Publish a console progress line
    pub async fn progress(
        &self,
        ctx: &ResolutionContext,
        level: ProgressLevel,
        message: impl Into<String>,
    ) -> Result<()> {
        self.publish_progress(TenantProgress::new(ctx, level, message))
            .await
    }

    pub(crate) async fn publish_progress(&self, progress: TenantProgress) -> Result<()> {
        match progress.level {
            ProgressLevel::Info => info!(tenant_id = ?progress.tenant_id, "{}", progress.message),
            ProgressLevel::Error => error!(tenant_id = ?progress.tenant_id, "{}", progress.message),
        }
        self.bus.publish(progress).await?;
        Ok(())
    }

    async fn abort(&self, ctx: &mut ResolutionContext) {
        if let Err(e) = self.switch.reset(ctx).await {
            error!(error = %e, "Failed to return to the default connection");
        }
        ctx.clear_tenant();
        ctx.set_state(ResolutionState::Unresolved);
    }
}

/// Builder for [`TenantLifecycle`]
#[derive(Default)]
pub struct TenantLifecycleBuilder {
    directory: Option<Arc<dyn TenantDirectory>>,
    pool: Option<Arc<dyn ConnectionPool>>,
    bus: Option<EventBus>,
    settings: TenancyConfig,
}

impl TenantLifecycleBuilder {
    /// Directory to resolve against. Required.
    pub fn directory(mut self, directory: Arc<dyn TenantDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Pool the connection switch drives. Required.
    pub fn pool(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Bus to publish on; a private one is created otherwise
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Tenancy settings; defaults otherwise
    pub fn settings(mut self, settings: TenancyConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Fails with [`TenantError::Invalid`] when the directory or pool is missing
    pub fn build(self) -> Result<TenantLifecycle> {
        let directory = self
            .directory
            .ok_or_else(|| TenantError::Invalid("a tenant directory is required".into()))?;
        let pool = self
            .pool
            .ok_or_else(|| TenantError::Invalid("a connection pool is required".into()))?;

        let resolver = IdentityResolver::new(directory)
            .with_pending_connection(self.settings.pending_connection.clone())
            .with_require_active(self.settings.require_active);

        Ok(TenantLifecycle {
            resolver,
            switch: ConnectionSwitch::new(pool),
            bus: self.bus.unwrap_or_default(),
            settings: Arc::new(self.settings),
        })
    }
}
