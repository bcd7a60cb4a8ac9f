//! The seam between the engine and the support system.
//!
//! The orchestrator and detector talk to [`TicketDesk`] rather than the
//! concrete gateway so tests can substitute an in-memory desk with
//! scripted accounts.

use async_trait::async_trait;
use zdmerge_client::{
    ClientResult, Identity, SearchResult, TicketPage, ZendeskGateway, ZendeskUser,
};

/// Operations the reconciliation engine needs from the support system.
///
/// Implementations are expected to apply their own rate discipline; the
/// engine never throttles on top.
#[async_trait]
pub trait TicketDesk: Send + Sync {
    /// Search accounts by email.
    async fn search_users(&self, email: &str) -> ClientResult<Vec<SearchResult>>;

    /// Merge the orphan account into the canonical account.
    async fn merge_user(&self, orphan_id: i64, canonical_id: i64) -> ClientResult<ZendeskUser>;

    /// List an account's contact identities.
    async fn list_identities(&self, user_id: i64) -> ClientResult<Vec<Identity>>;

    /// Make an identity primary; returns the updated identity list.
    async fn make_identity_primary(
        &self,
        user_id: i64,
        identity_id: i64,
    ) -> ClientResult<Vec<Identity>>;

    /// Fetch an account by id; `None` when it does not exist.
    async fn show_user(&self, user_id: i64) -> ClientResult<Option<ZendeskUser>>;

    /// First page of an account's requested tickets; `None` when the
    /// account is unknown to the ticket index.
    async fn requested_tickets(&self, user_id: i64) -> ClientResult<Option<TicketPage>>;

    /// Agent-facing link to an account, for audit rows.
    fn agent_link(&self, user_id: i64) -> String;
}

#[async_trait]
impl TicketDesk for ZendeskGateway {
    async fn search_users(&self, email: &str) -> ClientResult<Vec<SearchResult>> {
        ZendeskGateway::search_users(self, email).await
    }

    async fn merge_user(&self, orphan_id: i64, canonical_id: i64) -> ClientResult<ZendeskUser> {
        ZendeskGateway::merge_user(self, orphan_id, canonical_id).await
    }

    async fn list_identities(&self, user_id: i64) -> ClientResult<Vec<Identity>> {
        ZendeskGateway::list_identities(self, user_id).await
    }

    async fn make_identity_primary(
        &self,
        user_id: i64,
        identity_id: i64,
    ) -> ClientResult<Vec<Identity>> {
        ZendeskGateway::make_identity_primary(self, user_id, identity_id).await
    }

    async fn show_user(&self, user_id: i64) -> ClientResult<Option<ZendeskUser>> {
        ZendeskGateway::show_user(self, user_id).await
    }

    async fn requested_tickets(&self, user_id: i64) -> ClientResult<Option<TicketPage>> {
        ZendeskGateway::requested_tickets(self, user_id).await
    }

    fn agent_link(&self, user_id: i64) -> String {
        ZendeskGateway::agent_link(self, user_id)
    }
}
