//! envtenant CLI - inspect tenants and run commands per tenant.
//!
//! # Commands
//!
//! - `envtenant tenants` - List the tenant directory
//! - `envtenant resolve <host>` - Preview how a request to `host` is routed
//! - `envtenant status` - Show the connection a command runs against
//! - `envtenant table <name>` - Print a table name with the tenant prefix
//!
//! `--tenant <key>` scopes `status` and `table` to one tenant; `--tenant all`
//! runs them once per tenant.

use clap::{Parser, Subcommand};
use colored::Colorize;
use envtenant_core::TENANT_FLAG_HELP;
use envtenant_log::{Level, LogConfig};
use std::path::PathBuf;

mod commands;
mod error;

use commands::{GlobalOptions, resolve, status, table, tenants};
use error::CliResult;

/// envtenant - multi-tenant resolution tools
#[derive(Parser)]
#[command(name = "envtenant")]
#[command(version)]
#[command(about = "Inspect tenants and run commands against a tenant's connection")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} envtenant tenants\n  {} envtenant resolve acme.example.com\n  {} envtenant --tenant acme status\n  {} envtenant --tenant all table users",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML, JSON or .env); envtenant.toml is used when present
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON file with the tenant records
    #[arg(long, global = true, value_name = "PATH")]
    tenants: Option<PathBuf>,

    #[arg(long, global = true, value_name = "TENANT", help = TENANT_FLAG_HELP)]
    tenant: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List tenants with their routing keys and status
    #[command(alias = "ls")]
    Tenants {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a host the way an incoming request would be
    Resolve {
        /// Request host, e.g. acme.example.com
        host: String,

        /// First path segment of the request
        #[arg(long)]
        path: Option<String>,
    },

    /// Show the tenant, connection and prefix a command runs with
    Status,

    /// Print a table name with the active prefix applied
    Table {
        /// Unprefixed table name
        name: String,
    },
}

fn log_config(cli: &Cli) -> LogConfig {
    let config = envtenant_log::config().clone();
    if cli.verbose {
        config.with_level(Level::Debug)
    } else if cli.quiet {
        config.with_level(Level::Error)
    } else if std::env::var_os("ENVTENANT_LOG_LEVEL").is_some() {
        config
    } else {
        config.with_level(Level::Warn)
    }
}

async fn run(cli: &Cli) -> CliResult<i32> {
    let options = GlobalOptions {
        config: cli.config.as_deref(),
        tenants: cli.tenants.as_deref(),
        tenant: cli.tenant.as_deref(),
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Tenants { json } => tenants::run(&options, *json).await,
        Commands::Resolve { host, path } => resolve::run(&options, host, path.as_deref()).await,
        Commands::Status => commands::run_scoped(&options, &status::Status).await,
        Commands::Table { name } => {
            commands::run_scoped(&options, &table::Table { name: name.clone() }).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    envtenant_log::init_with(&log_config(&cli));

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("  {} {}", "✗".red().bold(), e.to_string().red());
            1
        }
    };

    std::process::exit(code);
}
