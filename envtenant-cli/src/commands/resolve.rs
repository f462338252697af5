//! Resolve command - preview how an HTTP request would be routed.

use colored::Colorize;
use envtenant_core::{RequestSource, TenantError, resolve_request};

use super::GlobalOptions;
use crate::error::CliResult;

/// Resolve `host` (and an optional first path segment) as a request would be.
///
/// Exits with 1 when no tenant matches.
pub async fn run(options: &GlobalOptions<'_>, host: &str, path: Option<&str>) -> CliResult<i32> {
    let lifecycle = super::lifecycle(options)?;
    let mut ctx = lifecycle.context();

    let mut source = RequestSource::new(host.trim().to_lowercase()).with_client_addr("cli");
    if let Some(segment) = path {
        source = source.with_path_segment(segment.trim_matches('/'));
    }

    match resolve_request(&lifecycle, &mut ctx, source).await {
        Ok(tenant) => {
            println!("  {} {}", "✓".green().bold(), tenant.to_string().green());
            println!("  {} {}", "Connection:".bright_white().bold(), ctx.connection());
            println!(
                "  {} {}",
                "Prefix:".bright_white().bold(),
                ctx.prefix().unwrap_or("-")
            );
            Ok(0)
        }
        Err(TenantError::NotResolved(key)) => {
            println!(
                "  {} {}",
                "✗".red().bold(),
                format!("Tenant could not be resolved for {}", key).red()
            );
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
