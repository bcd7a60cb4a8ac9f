//! The `run` subcommand: full reconciliation.

use clap::Args;
use std::path::{Path, PathBuf};
use zdmerge_engine::RunMode;

use super::Overrides;
use crate::error::CliResult;

/// Arguments for the run subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// Records per scanner page.
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Directory the audit report is written to.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

/// Execute a full reconciliation run.
pub async fn execute(config_path: &Path, args: RunArgs) -> CliResult<()> {
    super::execute_run(
        config_path,
        Overrides {
            page_size: args.page_size,
            report_dir: args.report_dir,
        },
        RunMode::Reconcile,
    )
    .await
}
