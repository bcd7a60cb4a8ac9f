//! Wire types for the Zendesk REST API.
//!
//! Deserialization is tolerant: optional fields default and unrecognized
//! user attributes are retained in `extra`, so a cache sync can carry them
//! through without the client knowing every field Zendesk returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a `search.json` response.
///
/// Search returns a heterogeneous result list; `result_type` distinguishes
/// users from tickets, organizations and groups.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    /// Zendesk object id.
    pub id: i64,
    /// Result kind ("user", "ticket", ...).
    #[serde(default)]
    pub result_type: Option<String>,
    /// Account email, when the result is a user.
    #[serde(default)]
    pub email: Option<String>,
    /// External reference id. `None` marks an auto-created (orphan)
    /// account.
    #[serde(default)]
    pub external_id: Option<String>,
}

impl SearchResult {
    /// Whether this result is a user record.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.result_type.as_deref() == Some("user")
    }
}

/// Envelope of a `search.json` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A Zendesk user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZendeskUser {
    pub id: i64,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Attributes this client does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Envelope of `users/{id}.json` and `users/{id}/merge.json` responses.
///
/// Zendesk answers show-user with either `{"user": ...}` or an
/// `{"error": "RecordNotFound"}` body; both shapes parse here.
#[derive(Debug, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub user: Option<ZendeskUser>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A contact identity attached to a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub user_id: i64,
    /// Identity kind ("email", "phone_number", ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

/// Envelope of identity list responses.
#[derive(Debug, Deserialize)]
pub struct IdentitiesResponse {
    #[serde(default)]
    pub identities: Vec<Identity>,
}

/// One page of `users/{id}/tickets/requested.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketPage {
    /// Total requested-ticket count reported by the endpoint.
    #[serde(default)]
    pub count: u64,
    /// Link to the next page; present when the count exceeds one page.
    #[serde(default)]
    pub next_page: Option<String>,
}
