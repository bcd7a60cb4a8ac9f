//! Per-record merge state machine.
//!
//! Each divergent record walks detect → eligibility → merge → re-primary
//! → local sync. Every step failure lands in the record's outcome instead
//! of aborting the run, and no step is ever replayed from a checkpoint:
//! external mutation and cache sync are non-transactional, so a crash
//! between them leaves the cache behind the support system until the next
//! run re-derives eligibility and heals it.

use serde_json::Value;
use tracing::{debug, info, warn};
use zdmerge_client::{ClientError, RetryPolicy, SearchResult};

use crate::desk::TicketDesk;
use crate::detector::OrphanDetector;
use crate::error::{EngineError, EngineResult};
use crate::meta::merge_meta;
use crate::outcome::{MergeFailure, MergeOutcome, SideReport, TicketTally};
use crate::scanner::{DivergentRecord, RecordStore};

/// Drives one record at a time through the merge state machine.
pub struct MergeOrchestrator<'a> {
    desk: &'a dyn TicketDesk,
    store: &'a dyn RecordStore,
    retry: RetryPolicy,
    scan_only: bool,
}

impl<'a> MergeOrchestrator<'a> {
    /// Create an orchestrator. `retry` bounds the re-primary step.
    #[must_use]
    pub fn new(desk: &'a dyn TicketDesk, store: &'a dyn RecordStore, retry: RetryPolicy) -> Self {
        Self {
            desk,
            store,
            retry,
            scan_only: false,
        }
    }

    /// Detect and report only; skip every mutating step.
    #[must_use]
    pub fn with_scan_only(mut self, scan_only: bool) -> Self {
        self.scan_only = scan_only;
        self
    }

    /// Process one record to a finalized outcome.
    pub async fn process(&self, record: &DivergentRecord) -> MergeOutcome {
        let mut outcome = MergeOutcome::new(record);
        let detector = OrphanDetector::new(self.desk);

        // Both lookups are independent; the gateway serializes them anyway.
        let (orphan_found, canonical_found) = tokio::join!(
            detector.resolve(&record.email, Some(record.zendesk_id.as_str())),
            detector.resolve(&record.meta_email, record.meta_id.as_deref()),
        );

        let orphan_found = match orphan_found {
            Ok(found) => found,
            Err(e) => return self.detection_failed(outcome, &record.email, e),
        };
        let canonical_found = match canonical_found {
            Ok(found) => found,
            Err(e) => return self.detection_failed(outcome, &record.meta_email, e),
        };

        outcome.orphan = self.describe(orphan_found).await;
        outcome.canonical = self.describe(canonical_found).await;

        outcome.eligible = outcome.orphan.is_orphan() && outcome.canonical.is_canonical();
        if !outcome.eligible {
            debug!(
                user_id = %record.user_id,
                orphan_found = outcome.orphan.found(),
                canonical_found = outcome.canonical.found(),
                "record not eligible for merge"
            );
            return outcome;
        }
        if self.scan_only {
            return outcome;
        }

        let (Some(orphan_id), Some(canonical_id)) =
            (outcome.orphan.account_id, outcome.canonical.account_id)
        else {
            outcome.failure = Some(MergeFailure::Detection(
                "eligible record lost its account ids".into(),
            ));
            return outcome;
        };

        // MERGING: terminal on any mismatch; a half-applied merge is an
        // externally visible side effect and must not be repeated blindly.
        match self.desk.merge_user(orphan_id, canonical_id).await {
            Ok(survivor) => {
                if survivor.id != canonical_id {
                    outcome.failure = Some(MergeFailure::MergeVerification(format!(
                        "merge answered account {} instead of {}",
                        survivor.id, canonical_id
                    )));
                    return outcome;
                }
                if survivor.external_id.is_none() {
                    outcome.failure = Some(MergeFailure::MergeVerification(format!(
                        "surviving account {canonical_id} carries no external id"
                    )));
                    return outcome;
                }
                outcome.merged = true;
                info!(
                    user_id = %record.user_id,
                    orphan_id,
                    canonical_id,
                    "merged orphan account into canonical account"
                );
            }
            Err(e) => {
                warn!(user_id = %record.user_id, orphan_id, canonical_id, error = %e, "merge call failed");
                outcome.failure = Some(MergeFailure::Merge(e.to_string()));
                return outcome;
            }
        }

        outcome.post_merge_tickets = self.ticket_tally(canonical_id).await;

        // PRIMARY_PENDING: bounded retry with backoff, explicit terminal
        // failure.
        match self.set_primary_email(canonical_id, &record.email).await {
            Ok(()) => outcome.primary_updated = true,
            Err(failure) => {
                warn!(user_id = %record.user_id, canonical_id, %failure, "primary update failed");
                outcome.failure = Some(failure);
                return outcome;
            }
        }

        // LOCAL_SYNCING: failure leaves the outcome partially complete;
        // the next run re-derives eligibility and heals the divergence.
        match self.sync_local_cache(record, canonical_id).await {
            Ok(()) => outcome.local_synced = true,
            Err(e) => {
                warn!(
                    user_id = %record.user_id,
                    email = %record.email,
                    canonical_id,
                    error = %e,
                    "cache sync failed, row left stale"
                );
                outcome.failure = Some(MergeFailure::LocalSync(e.to_string()));
            }
        }

        outcome
    }

    fn detection_failed(
        &self,
        mut outcome: MergeOutcome,
        email: &str,
        error: EngineError,
    ) -> MergeOutcome {
        warn!(user_id = %outcome.user_id, email, error = %error, "account resolution failed");
        outcome.failure = Some(MergeFailure::Detection(error.to_string()));
        outcome
    }

    /// Build the audit-facing report for one detection side.
    async fn describe(&self, found: Option<SearchResult>) -> SideReport {
        match found {
            Some(account) => {
                let tickets = self.ticket_tally(account.id).await;
                SideReport {
                    account_id: Some(account.id),
                    link: Some(self.desk.agent_link(account.id)),
                    external_id: account.external_id,
                    tickets,
                }
            }
            None => SideReport::default(),
        }
    }

    /// Ticket tally for an account; a failed fetch degrades to an empty
    /// column rather than blocking reconciliation.
    async fn ticket_tally(&self, user_id: i64) -> Option<TicketTally> {
        match self.desk.requested_tickets(user_id).await {
            Ok(page) => Some(TicketTally::from_page(page)),
            Err(e) => {
                warn!(user_id, error = %e, "ticket count fetch failed");
                None
            }
        }
    }

    /// Make `email` the primary identity of the account, retrying
    /// transient failures up to the policy's budget.
    async fn set_primary_email(&self, user_id: i64, email: &str) -> Result<(), MergeFailure> {
        let attempt = self
            .retry
            .execute("set_primary_email", || {
                self.try_set_primary(user_id, email)
            })
            .await;

        match attempt {
            Ok(()) => Ok(()),
            Err(ClientError::NotFound(_)) => {
                Err(MergeFailure::PrimaryIdentityMissing(email.to_string()))
            }
            Err(e) => Err(MergeFailure::PrimaryUpdate(e.to_string())),
        }
    }

    async fn try_set_primary(&self, user_id: i64, email: &str) -> Result<(), ClientError> {
        let identities = self.desk.list_identities(user_id).await?;
        let Some(target) = identities
            .iter()
            .find(|i| i.kind == "email" && i.value.eq_ignore_ascii_case(email))
        else {
            return Err(ClientError::NotFound(format!(
                "no email identity matching {email} on account {user_id}"
            )));
        };

        if target.primary {
            debug!(user_id, identity_id = target.id, "identity already primary");
            return Ok(());
        }

        let updated = self.desk.make_identity_primary(user_id, target.id).await?;
        if updated.iter().any(|i| i.id == target.id && i.primary) {
            Ok(())
        } else {
            Err(ClientError::verification(format!(
                "identity {} still not primary after make_primary",
                target.id
            )))
        }
    }

    /// Refresh the cache row from the surviving account.
    ///
    /// The read-back may race replication on the support side; the
    /// canonical email is overlaid from the local record, and any other
    /// staleness heals on the next run.
    async fn sync_local_cache(
        &self,
        record: &DivergentRecord,
        canonical_id: i64,
    ) -> EngineResult<()> {
        let fresh = self
            .desk
            .show_user(canonical_id)
            .await?
            .ok_or_else(|| {
                EngineError::internal(format!("account {canonical_id} not readable after merge"))
            })?;
        let row = self
            .store
            .find_cache_row(record.user_id)
            .await?
            .ok_or_else(|| {
                EngineError::internal(format!("no cache row for user {}", record.user_id))
            })?;

        let mut patch = serde_json::to_value(&fresh)?;
        patch["email"] = Value::String(record.email.clone());

        let merged = merge_meta(row.meta.unwrap_or(Value::Null), patch);
        self.store.update_cache_meta(record.user_id, &merged).await
    }
}
