//! All-Tenants Runner
//!
//! Runs one unit of work per tenant, strictly one after another on a single
//! [`ResolutionContext`]. Iterations are never run concurrently: each one
//! owns the context from activation until its unit of work returns.

use crate::context::ResolutionContext;
use crate::error::{BoxError, Result, TenantError};
use crate::events::{ProgressLevel, TenantProgress};
use crate::lifecycle::TenantLifecycle;
use crate::tenant::Tenant;
use async_trait::async_trait;
use tracing::error;

/// Work run under an activated tenant. Returns a process exit code.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Run against the connection and prefix recorded in `ctx`
    async fn run(&self, ctx: &ResolutionContext) -> std::result::Result<i32, BoxError>;
}

/// What to do when a tenant's unit of work fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and return the failure
    #[default]
    Abort,
    /// Record the failure and move on to the next tenant
    Continue,
}

/// A tenant whose unit of work failed under [`FailurePolicy::Continue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantFailure {
    /// Id of the failed tenant
    pub tenant_id: u64,
    /// Name of the failed tenant
    pub tenant_name: String,
    /// Rendered error
    pub error: String,
}

/// Summary of an all-tenants run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Exit code of the last completed unit of work, 0 if none completed
    pub exit_code: i32,
    /// Ids of tenants whose unit of work returned
    pub completed: Vec<u64>,
    /// Ids of unprovisioned tenants left out
    pub skipped: Vec<u64>,
    /// Failures recorded under [`FailurePolicy::Continue`]
    pub failures: Vec<TenantFailure>,
}

impl RunReport {
    /// Whether no unit of work failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a [`UnitOfWork`] for every tenant in directory order
pub struct AllTenantsRunner<'a> {
    lifecycle: &'a TenantLifecycle,
    policy: FailurePolicy,
    skip_unprovisioned: bool,
}

impl<'a> AllTenantsRunner<'a> {
    /// Policy and skipping follow the lifecycle's `all_tenants` settings
    pub fn new(lifecycle: &'a TenantLifecycle) -> Self {
        let settings = &lifecycle.settings().all_tenants;
        Self {
            lifecycle,
            policy: if settings.continue_on_error {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
            skip_unprovisioned: settings.skip_unprovisioned,
        }
    }

    /// Override the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Skip tenants without a usable connection instead of reporting them as
    /// failures. Unprovisioned tenants are never activated either way.
    pub fn skip_unprovisioned(mut self, skip: bool) -> Self {
        self.skip_unprovisioned = skip;
        self
    }

    /// Activate each tenant in turn and run `work` under it.
    ///
    /// Progress lines are published for every tenant. Under
    /// [`FailurePolicy::Abort`] the first failure is returned as
    /// [`TenantError::UnitOfWork`].
    pub async fn for_each_tenant(
        &self,
        ctx: &mut ResolutionContext,
        work: &dyn UnitOfWork,
    ) -> Result<RunReport> {
        let tenants = self.lifecycle.directory().list_all().await?;
        let sentinel = self.lifecycle.settings().pending_connection.clone();
        let mut report = RunReport::default();
        let mut switched = false;

        for tenant in &tenants {
            if !tenant.is_provisioned(&sentinel) {
                let message = format!("Skipping {}: tenant is not provisioned", tenant.name);
                if self.skip_unprovisioned {
                    self.lifecycle
                        .publish_progress(
                            TenantProgress::new(ctx, ProgressLevel::Info, message).for_tenant(tenant),
                        )
                        .await?;
                    report.skipped.push(tenant.id);
                    continue;
                }

                let source: BoxError = message.into();
                self.fail(ctx, &mut report, tenant, source).await?;
                continue;
            }

            if switched {
                self.lifecycle.reconnect_default_connection(ctx).await?;
            }
            self.lifecycle.activate(ctx, tenant).await?;
            switched = true;

            self.lifecycle
                .progress(
                    ctx,
                    ProgressLevel::Info,
                    format!("Running command for {}", tenant.name),
                )
                .await?;

            match work.run(ctx).await {
                Ok(code) => {
                    report.exit_code = code;
                    report.completed.push(tenant.id);
                }
                Err(source) => self.fail(ctx, &mut report, tenant, source).await?,
            }
        }

        Ok(report)
    }

    async fn fail(
        &self,
        ctx: &ResolutionContext,
        report: &mut RunReport,
        tenant: &Tenant,
        source: BoxError,
    ) -> Result<()> {
        error!(
            tenant_id = tenant.id,
            tenant = %tenant.name,
            connection = %ctx.connection(),
            error = %source,
            "Command failed for tenant"
        );

        match self.policy {
            FailurePolicy::Abort => Err(TenantError::UnitOfWork {
                tenant_id: tenant.id,
                tenant_name: tenant.name.clone(),
                source,
            }),
            FailurePolicy::Continue => {
                let message = format!("Failed for {}: {}", tenant.name, source);
                self.lifecycle
                    .publish_progress(
                        TenantProgress::new(ctx, ProgressLevel::Error, message).for_tenant(tenant),
                    )
                    .await?;
                report.failures.push(TenantFailure {
                    tenant_id: tenant.id,
                    tenant_name: tenant.name.clone(),
                    error: source.to_string(),
                });
                Ok(())
            }
        }
    }
}
