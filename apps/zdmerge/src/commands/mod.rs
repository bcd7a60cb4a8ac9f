//! CLI subcommands.

pub mod run;
pub mod scan;

use sqlx::postgres::PgPoolOptions;
use std::path::{Path, PathBuf};
use tracing::info;
use zdmerge_client::ZendeskGateway;
use zdmerge_engine::{PgRecordStore, ReconciliationRun, RunMode, RunSummary};

use crate::config::AppConfig;
use crate::error::CliResult;

/// Per-invocation overrides shared by the subcommands.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub page_size: Option<i64>,
    pub report_dir: Option<PathBuf>,
}

/// Load configuration, wire the gateway and store, execute a run.
pub(crate) async fn execute_run(
    config_path: &Path,
    overrides: Overrides,
    mode: RunMode,
) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    config.apply_env();
    if let Some(page_size) = overrides.page_size {
        config.engine.page_size = page_size;
    }
    if let Some(report_dir) = overrides.report_dir {
        config.engine.report_dir = report_dir;
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    info!(zendesk = %config.zendesk.base_url, "connected to the local datastore");

    let gateway = ZendeskGateway::new(config.zendesk.clone())?;
    let store = PgRecordStore::new(pool);

    let run = ReconciliationRun::new(&gateway, &store, config.engine.clone(), mode);
    let summary = run.execute().await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {} record(s) over {} page(s)",
        summary.records, summary.pages
    );
    println!(
        "  orphans: {}  canonical: {}  eligible: {}",
        summary.orphan_accounts, summary.canonical_accounts, summary.eligible
    );
    println!(
        "  merged: {}  primary updated: {}  cache synced: {}  failures: {}",
        summary.merged, summary.primary_updated, summary.local_synced, summary.failures
    );
    if let Some(path) = &summary.report_path {
        println!("Report: {}", path.display());
    }
}
