//! Tenants command - list the tenant directory.

use colored::Colorize;
use envtenant_core::Tenant;

use super::GlobalOptions;
use crate::error::CliResult;

/// List every tenant with its routing keys and provisioning status.
pub async fn run(options: &GlobalOptions<'_>, json: bool) -> CliResult<i32> {
    let lifecycle = super::lifecycle(options)?;
    let tenants = lifecycle.directory().list_all().await?;
    let sentinel = &lifecycle.settings().pending_connection;

    if json {
        println!("{}", serde_json::to_string_pretty(&tenants)?);
        return Ok(0);
    }

    if tenants.is_empty() {
        println!("  {} No tenants found", "⚠".yellow());
        return Ok(0);
    }

    println!();
    println!(
        "  {:<6} {:<20} {:<16} {:<24} {:<16} {}",
        "ID".bright_white().bold(),
        "NAME".bright_white().bold(),
        "SUBDOMAIN".bright_white().bold(),
        "ALIAS".bright_white().bold(),
        "CONNECTION".bright_white().bold(),
        "STATUS".bright_white().bold()
    );
    for tenant in &tenants {
        println!(
            "  {:<6} {:<20} {:<16} {:<24} {:<16} {}",
            tenant.id,
            tenant.name,
            tenant.subdomain.as_deref().unwrap_or("-"),
            tenant.alias_domain.as_deref().unwrap_or("-"),
            tenant.connection.as_deref().unwrap_or("-"),
            status(tenant, sentinel)
        );
    }
    println!();
    println!("  {} {} tenant(s)", "→".cyan(), tenants.len());

    Ok(0)
}

fn status(tenant: &Tenant, sentinel: &str) -> colored::ColoredString {
    if !tenant.is_provisioned(sentinel) {
        "pending".yellow()
    } else if !tenant.is_active {
        "inactive".dimmed()
    } else {
        "ready".green()
    }
}
