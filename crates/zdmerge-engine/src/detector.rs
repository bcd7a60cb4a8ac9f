//! Orphan detection: resolve an email to its best-matching account.

use tracing::{debug, warn};
use zdmerge_client::{ClientError, SearchResult};

use crate::desk::TicketDesk;
use crate::error::EngineResult;

/// Resolves an email (and optional known account id) to a support-system
/// account via the gateway's search endpoint.
pub struct OrphanDetector<'a> {
    desk: &'a dyn TicketDesk,
}

impl<'a> OrphanDetector<'a> {
    /// Create a detector over a desk.
    #[must_use]
    pub fn new(desk: &'a dyn TicketDesk) -> Self {
        Self { desk }
    }

    /// Find the account for `email`.
    ///
    /// Among user-type results, the first whose email matches
    /// case-insensitively or whose id equals `hint_id` wins. The id
    /// alternative recovers an account whose email already diverged from
    /// the search key, as long as the id is known.
    ///
    /// Returns `Ok(None)` when nothing matches. Malformed search payloads
    /// also resolve to `None` (fail closed) after the parse error is
    /// logged; transport and API failures propagate to the per-record
    /// boundary.
    pub async fn resolve(
        &self,
        email: &str,
        hint_id: Option<&str>,
    ) -> EngineResult<Option<SearchResult>> {
        let results = match self.desk.search_users(email).await {
            Ok(results) => results,
            Err(ClientError::Parse { message }) => {
                warn!(email, %message, "search response unparseable, treating as not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let matched = results.into_iter().filter(SearchResult::is_user).find(|c| {
            let email_matches = c
                .email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email));
            let id_matches = hint_id.is_some_and(|hint| c.id.to_string() == hint);
            email_matches || id_matches
        });

        if matched.is_none() {
            debug!(email, "no account matched the search");
        }
        Ok(matched)
    }
}
