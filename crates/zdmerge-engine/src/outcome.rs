//! Per-record outcome types.

use std::fmt;
use uuid::Uuid;
use zdmerge_client::TicketPage;

use crate::scanner::DivergentRecord;

/// Audit-facing rendering of a requested-ticket count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketTally {
    /// The endpoint reported a complete count.
    Exact(u64),
    /// The count spilled past the first page.
    MoreThanPage,
    /// The account is unknown to the ticket index.
    RecordNotFound,
}

impl TicketTally {
    /// Classify one ticket page; `None` means the account was unknown.
    #[must_use]
    pub fn from_page(page: Option<TicketPage>) -> Self {
        match page {
            Some(page) if page.next_page.is_none() => Self::Exact(page.count),
            Some(_) => Self::MoreThanPage,
            None => Self::RecordNotFound,
        }
    }
}

impl fmt::Display for TicketTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(count) => write!(f, "{count}"),
            Self::MoreThanPage => write!(f, "More than 100"),
            Self::RecordNotFound => write!(f, "RecordNotFound"),
        }
    }
}

/// What detection found for one side (new-email or old-email) of a record.
#[derive(Debug, Clone, Default)]
pub struct SideReport {
    /// Account id, when a match was found.
    pub account_id: Option<i64>,
    /// Agent-facing account link.
    pub link: Option<String>,
    /// External reference id of the match (`None` both when unclaimed and
    /// when nothing matched; `account_id` disambiguates).
    pub external_id: Option<String>,
    /// Requested-ticket tally for the match.
    pub tickets: Option<TicketTally>,
}

impl SideReport {
    /// Whether a matching account exists.
    #[must_use]
    pub fn found(&self) -> bool {
        self.account_id.is_some()
    }

    /// Whether the match is a verified orphan (exists, no external id).
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.found() && self.external_id.is_none()
    }

    /// Whether the match is verified canonical (exists, claimed by a
    /// non-null external id).
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.found() && self.external_id.is_some()
    }
}

/// Why a record stopped short of DONE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeFailure {
    /// Account resolution failed on one side.
    Detection(String),
    /// The merge call failed in transport or at the API.
    Merge(String),
    /// The merge call answered, but the result violates the expected
    /// invariant. Terminal; never retried.
    MergeVerification(String),
    /// No email identity matching the target email exists on the
    /// canonical account.
    PrimaryIdentityMissing(String),
    /// make-primary kept failing past the retry budget.
    PrimaryUpdate(String),
    /// The cache-row sync failed after external state was mutated; the
    /// divergence heals on the next run.
    LocalSync(String),
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detection(m) => write!(f, "detection failed: {m}"),
            Self::Merge(m) => write!(f, "merge failed: {m}"),
            Self::MergeVerification(m) => write!(f, "merge verification failed: {m}"),
            Self::PrimaryIdentityMissing(email) => {
                write!(f, "no email identity matches {email}")
            }
            Self::PrimaryUpdate(m) => write!(f, "primary update failed: {m}"),
            Self::LocalSync(m) => write!(f, "local cache sync failed: {m}"),
        }
    }
}

/// One record's reconciliation outcome. Created at detection time,
/// finalized exactly once, append-only afterwards.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Local user id.
    pub user_id: Uuid,
    /// Canonical email from the user table.
    pub email: String,
    /// Cached email from the account snapshot.
    pub meta_email: String,
    /// New-email side (candidate orphan).
    pub orphan: SideReport,
    /// Old-email side (candidate canonical).
    pub canonical: SideReport,
    /// Both sides verified: orphan unclaimed, canonical claimed.
    pub eligible: bool,
    /// The merge completed and verified.
    pub merged: bool,
    /// The target email identity is primary on the surviving account.
    pub primary_updated: bool,
    /// The local cache row carries the post-merge account snapshot.
    pub local_synced: bool,
    /// Requested-ticket tally on the surviving account after the merge.
    pub post_merge_tickets: Option<TicketTally>,
    /// Why processing stopped, when it did.
    pub failure: Option<MergeFailure>,
}

impl MergeOutcome {
    /// Start an outcome for a record; every flag begins false.
    #[must_use]
    pub fn new(record: &DivergentRecord) -> Self {
        Self {
            user_id: record.user_id,
            email: record.email.clone(),
            meta_email: record.meta_email.clone(),
            orphan: SideReport::default(),
            canonical: SideReport::default(),
            eligible: false,
            merged: false,
            primary_updated: false,
            local_synced: false,
            post_merge_tickets: None,
            failure: None,
        }
    }

    /// Whether every step through local sync completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.eligible && self.merged && self.primary_updated && self.local_synced
    }
}
