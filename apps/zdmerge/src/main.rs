//! zdmerge: merge orphaned Zendesk accounts.
//!
//! When a user's primary email changes locally, the support system keeps
//! serving the cached account under the old address and auto-creates an
//! orphan under the new one. This tool scans for those divergent users,
//! merges eligible orphan/canonical pairs through the rate-limited API,
//! re-primaries the surviving email identity, refreshes the local cache
//! row, and writes a CSV audit report per run.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use error::CliResult;

/// Zendesk orphan-account reconciliation.
#[derive(Parser)]
#[command(name = "zdmerge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, default_value = "config/zdmerge.json")]
    config: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge eligible orphan accounts and write the audit report.
    Run(commands::run::RunArgs),

    /// Detect divergent accounts and report without mutating anything.
    Scan(commands::scan::ScanArgs),
}

// Single-threaded cooperative scheduling; the gateway's concurrency cap
// of 1 serializes all external traffic anyway.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(&cli.config, args).await,
        Commands::Scan(args) => commands::scan::execute(&cli.config, args).await,
    }
}
