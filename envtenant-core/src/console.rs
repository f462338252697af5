//! Console boundary
//!
//! A console command runs once without a tenant, once for the tenant named by
//! its `--tenant` option, or once per tenant when given a wildcard. A tenant
//! that does not resolve is reported. The command then runs on the default
//! connection against the base migrations when those are configured, and is
//! skipped otherwise.

use crate::context::ResolutionContext;
use crate::error::{Result, TenantError};
use crate::events::ProgressLevel;
use crate::lifecycle::{Resolution, TenantLifecycle};
use crate::resolver::ResolutionSource;
use crate::runner::{AllTenantsRunner, UnitOfWork};

/// Help text for the `--tenant` option
pub const TENANT_FLAG_HELP: &str = "The tenant subdomain or alias domain the command should be run for. Use * or all for every tenant.";

/// Exit code of a command skipped because its tenant did not resolve
/// and no base migrations are configured
pub const NOT_RESOLVED_EXIT_CODE: i32 = 1;

/// Parsed value of the `--tenant` option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantToken {
    /// Option absent or blank
    Unscoped,
    /// One of the configured wildcards
    All,
    /// Subdomain, alias domain or id of a single tenant
    Key(String),
}

impl TenantToken {
    /// Classify a raw `--tenant` value against the configured wildcards
    pub fn parse(raw: Option<&str>, wildcards: &[String]) -> Self {
        match raw.map(str::trim) {
            None | Some("") => TenantToken::Unscoped,
            Some(token) if wildcards.iter().any(|w| w.eq_ignore_ascii_case(token)) => {
                TenantToken::All
            }
            Some(token) => TenantToken::Key(token.to_string()),
        }
    }
}

/// One console invocation
pub struct ConsoleSession<'a> {
    lifecycle: &'a TenantLifecycle,
    token: TenantToken,
}

impl<'a> ConsoleSession<'a> {
    /// Session for the raw `--tenant` value `token`
    pub fn new(lifecycle: &'a TenantLifecycle, token: Option<&str>) -> Self {
        let token = TenantToken::parse(token, &lifecycle.settings().wildcards);
        Self { lifecycle, token }
    }

    /// Parsed `--tenant` value
    pub fn token(&self) -> &TenantToken {
        &self.token
    }

    /// Run `work` for the requested scope and return the exit code
    pub async fn run(&self, ctx: &mut ResolutionContext, work: &dyn UnitOfWork) -> Result<i32> {
        match &self.token {
            TenantToken::Unscoped => work.run(ctx).await.map_err(TenantError::Command),
            TenantToken::All => {
                let report = AllTenantsRunner::new(self.lifecycle)
                    .for_each_tenant(ctx, work)
                    .await?;
                Ok(if report.is_success() {
                    report.exit_code
                } else {
                    NOT_RESOLVED_EXIT_CODE
                })
            }
            TenantToken::Key(key) => {
                let source = ResolutionSource::console(Some(key.as_str()));
                match self.lifecycle.resolve(ctx, &source).await? {
                    Resolution::Resolved(tenant) => {
                        self.lifecycle
                            .progress(
                                ctx,
                                ProgressLevel::Info,
                                format!("Running command for {}", tenant.name),
                            )
                            .await?;
                        work.run(ctx).await.map_err(|source| TenantError::UnitOfWork {
                            tenant_id: tenant.id,
                            tenant_name: tenant.name.clone(),
                            source,
                        })
                    }
                    Resolution::NotResolved { .. } | Resolution::Unscoped => {
                        self.lifecycle
                            .progress(ctx, ProgressLevel::Error, "Failed to resolve tenant")
                            .await?;
                        if ctx.migrations().is_some() {
                            // Tenant-agnostic maintenance on the base migrations
                            work.run(ctx).await.map_err(TenantError::Command)
                        } else {
                            Ok(NOT_RESOLVED_EXIT_CODE)
                        }
                    }
                }
            }
        }
    }
}
