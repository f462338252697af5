//! Status command - show the connection a command would run against.

use async_trait::async_trait;
use colored::Colorize;
use envtenant_core::{BoxError, ResolutionContext, UnitOfWork};

/// Prints the tenant, connection, prefix and migration override of the
/// context it runs under.
pub struct Status;

#[async_trait]
impl UnitOfWork for Status {
    async fn run(&self, ctx: &ResolutionContext) -> Result<i32, BoxError> {
        let tenant = ctx
            .active_tenant()
            .map(ToString::to_string)
            .unwrap_or_else(|| "none".to_string());

        println!("  {} {}", "Tenant:".bright_white().bold(), tenant.cyan());
        println!("  {} {}", "Connection:".bright_white().bold(), ctx.connection());
        println!(
            "  {} {}",
            "Prefix:".bright_white().bold(),
            ctx.prefix().unwrap_or("-")
        );
        if let Some(migrations) = ctx.migrations() {
            println!("  {} {}", "Migrations:".bright_white().bold(), migrations);
        }

        Ok(0)
    }
}
