//! Run audit: one row per processed record, flushed once as CSV.
//!
//! The column set and order are part of the tool's external interface;
//! support staff work from this file, not from process logs.

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::error::EngineResult;
use crate::outcome::{MergeOutcome, SideReport};

const NOT_FOUND: &str = "NOT FOUND ON ZENDESK";

/// One audit row. Field order is the column order.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    #[serde(rename = "Email in users table")]
    pub email: String,
    #[serde(rename = "Zendesk account link for users table email")]
    pub orphan_link: String,
    #[serde(rename = "Zendesk external ID for users table email")]
    pub orphan_external_id: String,
    #[serde(rename = "Ticket count for users table email")]
    pub orphan_tickets: String,
    #[serde(rename = "Email in zendesk_users meta")]
    pub meta_email: String,
    #[serde(rename = "Zendesk account link for zendesk_users email")]
    pub canonical_link: String,
    #[serde(rename = "Zendesk external ID for zendesk_users email")]
    pub canonical_external_id: String,
    #[serde(rename = "Ticket count for zendesk_users email")]
    pub canonical_tickets: String,
    #[serde(rename = "Eligible for merge")]
    pub eligible: String,
    #[serde(rename = "Is merge successful")]
    pub merged: String,
    #[serde(rename = "Is primary updated on zendesk")]
    pub primary_updated: String,
    #[serde(rename = "Is zendesk_users meta updated")]
    pub local_synced: String,
    #[serde(rename = "Total ticket count after merge")]
    pub post_merge_tickets: String,
}

fn yes_no(flag: bool) -> String {
    let rendered = if flag { "YES" } else { "NO" };
    rendered.to_string()
}

fn link_of(side: &SideReport) -> String {
    side.link.clone().unwrap_or_else(|| NOT_FOUND.to_string())
}

fn external_id_of(side: &SideReport) -> String {
    if !side.found() {
        return NOT_FOUND.to_string();
    }
    side.external_id.clone().unwrap_or_else(|| "NULL".to_string())
}

fn tickets_of(side: &SideReport) -> String {
    side.tickets
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl From<&MergeOutcome> for AuditRow {
    fn from(outcome: &MergeOutcome) -> Self {
        Self {
            email: outcome.email.clone(),
            orphan_link: link_of(&outcome.orphan),
            orphan_external_id: external_id_of(&outcome.orphan),
            orphan_tickets: tickets_of(&outcome.orphan),
            meta_email: outcome.meta_email.clone(),
            canonical_link: link_of(&outcome.canonical),
            canonical_external_id: external_id_of(&outcome.canonical),
            canonical_tickets: tickets_of(&outcome.canonical),
            eligible: yes_no(outcome.eligible),
            merged: yes_no(outcome.merged),
            primary_updated: yes_no(outcome.primary_updated),
            local_synced: yes_no(outcome.local_synced),
            post_merge_tickets: outcome
                .post_merge_tickets
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Accumulates audit rows and writes the report once, at end of run.
#[derive(Debug, Default)]
pub struct AuditRecorder {
    rows: Vec<AuditRow>,
}

impl AuditRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome. Infallible: recording must never abort the
    /// run.
    pub fn record(&mut self, outcome: &MergeOutcome) {
        self.rows.push(AuditRow::from(outcome));
    }

    /// Number of rows recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the full batch to `path`. Fatal to the run's reporting when
    /// it fails; external mutations already performed stand regardless.
    pub fn flush(&self, path: &Path) -> EngineResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!(rows = self.rows.len(), path = %path.display(), "audit report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{MergeFailure, TicketTally};
    use uuid::Uuid;

    fn outcome() -> MergeOutcome {
        MergeOutcome {
            user_id: Uuid::new_v4(),
            email: "new@x.com".into(),
            meta_email: "old@x.com".into(),
            orphan: SideReport {
                account_id: Some(42),
                link: Some("https://acme.zendesk.com/agent/users/42".into()),
                external_id: None,
                tickets: Some(TicketTally::Exact(3)),
            },
            canonical: SideReport {
                account_id: Some(9),
                link: Some("https://acme.zendesk.com/agent/users/9".into()),
                external_id: Some("ext-123".into()),
                tickets: Some(TicketTally::MoreThanPage),
            },
            eligible: true,
            merged: true,
            primary_updated: true,
            local_synced: false,
            post_merge_tickets: Some(TicketTally::Exact(12)),
            failure: Some(MergeFailure::LocalSync("row missing".into())),
        }
    }

    #[test]
    fn test_row_rendering() {
        let row = AuditRow::from(&outcome());
        assert_eq!(row.email, "new@x.com");
        assert_eq!(row.orphan_external_id, "NULL");
        assert_eq!(row.orphan_tickets, "3");
        assert_eq!(row.canonical_external_id, "ext-123");
        assert_eq!(row.canonical_tickets, "More than 100");
        assert_eq!(row.eligible, "YES");
        assert_eq!(row.local_synced, "NO");
        assert_eq!(row.post_merge_tickets, "12");
    }

    #[test]
    fn test_unresolved_sides_render_not_found() {
        let mut unresolved = outcome();
        unresolved.orphan = SideReport::default();
        let row = AuditRow::from(&unresolved);
        assert_eq!(row.orphan_link, NOT_FOUND);
        assert_eq!(row.orphan_external_id, NOT_FOUND);
        assert_eq!(row.orphan_tickets, "");
    }

    #[test]
    fn test_flush_writes_columns_in_order() {
        let mut recorder = AuditRecorder::new();
        recorder.record(&outcome());
        assert_eq!(recorder.len(), 1);

        let dir = std::env::temp_dir().join(format!("zdmerge-audit-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.csv");
        recorder.flush(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let header = written.lines().next().unwrap();
        assert!(header.starts_with(
            "Email in users table,\
             Zendesk account link for users table email,\
             Zendesk external ID for users table email,\
             Ticket count for users table email,\
             Email in zendesk_users meta"
        ));
        assert!(header.ends_with("Total ticket count after merge"));
        assert!(written.lines().nth(1).unwrap().contains("ext-123"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
