//! Tenant notifications
//!
//! Published on the [`EventBus`](envtenant_events::EventBus) handed to the
//! lifecycle. Each event carries the id of the [`ResolutionContext`] that
//! raised it as its correlation id.

use crate::context::ResolutionContext;
use crate::tenant::Tenant;
use envtenant_events::{EventMetadata, impl_event};

fn metadata(name: &str, ctx: &ResolutionContext) -> EventMetadata {
    EventMetadata::new(name).with_correlation_id(ctx.id())
}

/// A tenant's connection became the active one
#[derive(Debug, Clone)]
pub struct TenantActivated {
    /// Event id, name and correlation id
    pub metadata: EventMetadata,
    /// The activated tenant
    pub tenant: Tenant,
    /// Connection now in effect
    pub connection: String,
    /// Prefix now in effect
    pub prefix: Option<String>,
}

impl TenantActivated {
    /// Event name
    pub const NAME: &'static str = "tenant.activated";

    /// Snapshot of the connection and prefix `ctx` now runs under
    pub fn new(ctx: &ResolutionContext, tenant: &Tenant) -> Self {
        Self {
            metadata: metadata(Self::NAME, ctx),
            tenant: tenant.clone(),
            connection: ctx.connection().to_string(),
            prefix: ctx.prefix().map(String::from),
        }
    }
}

impl_event!(TenantActivated);

/// The unit of work was resolved to a tenant
#[derive(Debug, Clone)]
pub struct TenantResolved {
    /// Event id, name and correlation id
    pub metadata: EventMetadata,
    /// The resolved tenant
    pub tenant: Tenant,
}

impl TenantResolved {
    /// Event name
    pub const NAME: &'static str = "tenant.resolved";

    /// Event for `tenant`, correlated with `ctx`
    pub fn new(ctx: &ResolutionContext, tenant: &Tenant) -> Self {
        Self {
            metadata: metadata(Self::NAME, ctx),
            tenant: tenant.clone(),
        }
    }
}

impl_event!(TenantResolved);

/// No tenant matched the attempted key
#[derive(Debug, Clone)]
pub struct TenantNotResolved {
    /// Event id, name and correlation id
    pub metadata: EventMetadata,
    /// Host, or console token, the lookup used
    pub key: String,
}

impl TenantNotResolved {
    /// Event name
    pub const NAME: &'static str = "tenant.not_resolved";

    /// Event for the failed lookup of `key`, correlated with `ctx`
    pub fn new(ctx: &ResolutionContext, key: impl Into<String>) -> Self {
        Self {
            metadata: metadata(Self::NAME, ctx),
            key: key.into(),
        }
    }
}

impl_event!(TenantNotResolved);

/// Severity of a [`TenantProgress`] line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLevel {
    /// Routine progress, such as the tenant a command runs for
    Info,
    /// A tenant could not be resolved or its unit of work failed
    Error,
}

/// Human-readable console progress line
#[derive(Debug, Clone)]
pub struct TenantProgress {
    /// Event id, name and correlation id
    pub metadata: EventMetadata,
    /// Severity
    pub level: ProgressLevel,
    /// Line shown to the operator
    pub message: String,
    /// Tenant the line is about, if any
    pub tenant_id: Option<u64>,
}

impl TenantProgress {
    /// Event name
    pub const NAME: &'static str = "tenant.progress";

    /// Progress line attributed to the active tenant of `ctx`
    pub fn new(ctx: &ResolutionContext, level: ProgressLevel, message: impl Into<String>) -> Self {
        Self {
            metadata: metadata(Self::NAME, ctx),
            level,
            message: message.into(),
            tenant_id: ctx.active_tenant().map(|t| t.id),
        }
    }

    /// Attribute the line to `tenant` instead
    pub fn for_tenant(mut self, tenant: &Tenant) -> Self {
        self.tenant_id = Some(tenant.id);
        self
    }
}

impl_event!(TenantProgress);

#[cfg(test)]
mod tests {
    use super::*;
    use envtenant_events::Event;

    #[test]
    fn test_events_carry_context_id() {
        let ctx = ResolutionContext::new("mysql");
        let tenant = Tenant::new(7, "Acme");

        let resolved = TenantResolved::new(&ctx, &tenant);
        assert_eq!(resolved.event_name(), "tenant.resolved");
        assert_eq!(resolved.metadata.correlation_id, Some(ctx.id()));

        let missing = TenantNotResolved::new(&ctx, "ghost.example.com");
        assert_eq!(missing.key, "ghost.example.com");
        assert_eq!(missing.event_name(), TenantNotResolved::NAME);
    }

    #[test]
    fn test_activated_snapshots_connection() {
        let ctx = ResolutionContext::new("mysql");
        let tenant = Tenant::new(7, "Acme");

        let activated = TenantActivated::new(&ctx, &tenant);
        assert_eq!(activated.connection, "mysql");
        assert_eq!(activated.prefix, None);
    }

    #[test]
    fn test_progress_tenant() {
        let ctx = ResolutionContext::new("mysql");
        let progress = TenantProgress::new(&ctx, ProgressLevel::Info, "Running command for Acme");
        assert_eq!(progress.tenant_id, None);

        let progress = progress.for_tenant(&Tenant::new(7, "Acme"));
        assert_eq!(progress.tenant_id, Some(7));
    }
}
