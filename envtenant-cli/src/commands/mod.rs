//! CLI command implementations.

pub mod resolve;
pub mod status;
pub mod table;
pub mod tenants;

use colored::Colorize;
use envtenant_config::TenancyConfig;
use envtenant_core::{
    ConnectionRegistry, ConsoleSession, InMemoryTenantDirectory, ProgressLevel, TenantLifecycle,
    TenantProgress, UnitOfWork,
};
use envtenant_events::EventBus;
use std::path::Path;
use std::sync::Arc;

use crate::error::CliResult;

/// Options shared by every command
pub struct GlobalOptions<'a> {
    pub config: Option<&'a Path>,
    pub tenants: Option<&'a Path>,
    pub tenant: Option<&'a str>,
    pub quiet: bool,
}

/// Build the lifecycle from settings, the tenants file and a progress printer.
pub fn lifecycle(options: &GlobalOptions<'_>) -> CliResult<TenantLifecycle> {
    let settings = TenancyConfig::load(options.config)?;

    let tenants_file = options
        .tenants
        .map(Path::to_path_buf)
        .or_else(|| settings.tenants_file.clone());
    let directory = match tenants_file {
        Some(path) => InMemoryTenantDirectory::from_json_file(path)?,
        None => InMemoryTenantDirectory::new(),
    };

    let bus = EventBus::new();
    if !options.quiet {
        bus.on(|progress: &TenantProgress| {
            print_progress(progress);
            Ok(())
        });
    }

    let lifecycle = TenantLifecycle::builder()
        .directory(Arc::new(directory))
        .pool(Arc::new(ConnectionRegistry::from_config(&settings)))
        .bus(bus)
        .settings(settings)
        .build()?;

    Ok(lifecycle)
}

/// Run `work` for the scope selected by `--tenant`.
pub async fn run_scoped(options: &GlobalOptions<'_>, work: &dyn UnitOfWork) -> CliResult<i32> {
    let lifecycle = lifecycle(options)?;
    let mut ctx = lifecycle.context();
    let code = ConsoleSession::new(&lifecycle, options.tenant)
        .run(&mut ctx, work)
        .await?;
    Ok(code)
}

fn print_progress(progress: &TenantProgress) {
    match progress.level {
        ProgressLevel::Info => println!("  {} {}", "→".cyan(), progress.message),
        ProgressLevel::Error => println!("  {} {}", "✗".red().bold(), progress.message.red()),
    }
}
