//! The `scan` subcommand: detect and report, mutate nothing.

use clap::Args;
use std::path::{Path, PathBuf};
use zdmerge_engine::RunMode;

use super::Overrides;
use crate::error::CliResult;

/// Arguments for the scan subcommand.
#[derive(Args)]
pub struct ScanArgs {
    /// Records per scanner page.
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Directory the scan report is written to.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

/// Execute a detect-only scan.
pub async fn execute(config_path: &Path, args: ScanArgs) -> CliResult<()> {
    super::execute_run(
        config_path,
        Overrides {
            page_size: args.page_size,
            report_dir: args.report_dir,
        },
        RunMode::ScanOnly,
    )
    .await
}
