//! Run driver: the fold over the divergent-record pages.

use chrono::Utc;
use std::path::PathBuf;
use tracing::{error, info};

use crate::audit::AuditRecorder;
use crate::config::EngineConfig;
use crate::desk::TicketDesk;
use crate::error::EngineResult;
use crate::orchestrator::MergeOrchestrator;
use crate::outcome::MergeOutcome;
use crate::scanner::{RecordScanner, RecordStore};

/// What the run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Detect, merge, re-primary, sync.
    Reconcile,
    /// Detect and report only; no external or local mutation.
    ScanOnly,
}

impl RunMode {
    /// String form for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Reconcile => "reconcile",
            RunMode::ScanOnly => "scan-only",
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Pages drained.
    pub pages: u64,
    /// Records processed.
    pub records: u64,
    /// New-email matches that are verified orphans.
    pub orphan_accounts: u64,
    /// Old-email matches that are verified canonical.
    pub canonical_accounts: u64,
    /// Records that passed the eligibility gate.
    pub eligible: u64,
    /// Verified merges.
    pub merged: u64,
    /// Primary-identity updates.
    pub primary_updated: u64,
    /// Cache rows synced.
    pub local_synced: u64,
    /// Records that stopped on a failure.
    pub failures: u64,
    /// Where the audit report landed.
    pub report_path: Option<PathBuf>,
}

impl RunSummary {
    fn absorb(&mut self, outcome: &MergeOutcome) {
        self.records += 1;
        if outcome.orphan.is_orphan() {
            self.orphan_accounts += 1;
        }
        if outcome.canonical.is_canonical() {
            self.canonical_accounts += 1;
        }
        if outcome.eligible {
            self.eligible += 1;
        }
        if outcome.merged {
            self.merged += 1;
        }
        if outcome.primary_updated {
            self.primary_updated += 1;
        }
        if outcome.local_synced {
            self.local_synced += 1;
        }
        if outcome.failure.is_some() {
            self.failures += 1;
        }
    }
}

/// One reconciliation run over the full divergent set.
pub struct ReconciliationRun<'a> {
    desk: &'a dyn TicketDesk,
    store: &'a dyn RecordStore,
    config: EngineConfig,
    mode: RunMode,
}

impl<'a> ReconciliationRun<'a> {
    /// Create a run.
    #[must_use]
    pub fn new(
        desk: &'a dyn TicketDesk,
        store: &'a dyn RecordStore,
        config: EngineConfig,
        mode: RunMode,
    ) -> Self {
        Self {
            desk,
            store,
            config,
            mode,
        }
    }

    /// Drain every page, record every outcome, flush the report.
    ///
    /// Row-level failures never abort the loop; only a page-fetch failure
    /// or a report-flush failure is fatal.
    pub async fn execute(&self) -> EngineResult<RunSummary> {
        info!(
            mode = self.mode.as_str(),
            page_size = self.config.page_size,
            "reconciliation run starting"
        );

        let orchestrator = MergeOrchestrator::new(self.desk, self.store, self.config.retry.clone())
            .with_scan_only(self.mode == RunMode::ScanOnly);
        let mut scanner = RecordScanner::new(self.store, self.config.page_size);
        let mut audit = AuditRecorder::new();
        let mut summary = RunSummary::default();

        while let Some(page) = scanner.next_page().await? {
            for record in &page {
                let outcome = orchestrator.process(record).await;
                summary.absorb(&outcome);
                audit.record(&outcome);
            }
            summary.pages += 1;
            info!(
                pages = summary.pages,
                records = summary.records,
                orphans = summary.orphan_accounts,
                canonical = summary.canonical_accounts,
                merged = summary.merged,
                failures = summary.failures,
                "page drained"
            );
        }

        let report_path = self.report_path();
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(e) = audit.flush(&report_path) {
            error!(path = %report_path.display(), error = %e, "audit report flush failed");
            return Err(e);
        }
        summary.report_path = Some(report_path);

        info!(
            records = summary.records,
            eligible = summary.eligible,
            merged = summary.merged,
            primary_updated = summary.primary_updated,
            local_synced = summary.local_synced,
            failures = summary.failures,
            "reconciliation run finished"
        );
        Ok(summary)
    }

    fn report_path(&self) -> PathBuf {
        let prefix = match self.mode {
            RunMode::Reconcile => "merge_zendesk_orphan_accounts",
            RunMode::ScanOnly => "zendesk_orphan_accounts_scan",
        };
        self.config
            .report_dir
            .join(format!("{prefix}_{}.csv", Utc::now().timestamp_millis()))
    }
}
