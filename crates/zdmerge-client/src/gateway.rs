//! Zendesk gateway (reqwest-based).
//!
//! Single chokepoint for every call to the support system: each operation
//! funnels through [`ZendeskGateway::get`]/[`ZendeskGateway::put`], which
//! acquire the shared [`RateLimiter`] before the request leaves the
//! process and hold the concurrency permit until the response is read.

use crate::auth::ApiCredentials;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    IdentitiesResponse, Identity, SearchResponse, SearchResult, TicketPage, UserResponse,
    ZendeskUser,
};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the gateway.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the Zendesk instance (e.g. "<https://acme.zendesk.com>").
    pub base_url: String,
    /// API-token credentials.
    pub credentials: ApiCredentials,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Shared call budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Rate-limited Zendesk API client.
pub struct ZendeskGateway {
    base_url: String,
    credentials: ApiCredentials,
    http: Client,
    limiter: RateLimiter,
}

impl ZendeskGateway {
    /// Create a gateway from configuration.
    pub fn new(config: GatewayConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("zdmerge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            http,
            limiter: RateLimiter::new(config.rate_limit),
        })
    }

    /// Create a gateway with a pre-built HTTP client and limiter (for
    /// tests).
    #[must_use]
    pub fn with_http_client(
        base_url: String,
        credentials: ApiCredentials,
        http: Client,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http,
            limiter,
        }
    }

    /// Agent-facing link to an account, used in audit reports.
    #[must_use]
    pub fn agent_link(&self, user_id: i64) -> String {
        format!("{}/agent/users/{}", self.base_url, user_id)
    }

    // ── Operations ────────────────────────────────────────────────────

    /// Search accounts by email. Returns the raw result list; callers
    /// apply the user-type and match filters.
    pub async fn search_users(&self, email: &str) -> ClientResult<Vec<SearchResult>> {
        let url = format!("{}/api/v2/search.json", self.base_url);
        let query = format!("email:{email}");
        let response: SearchResponse = self.get(&url, Some(("query", query.as_str()))).await?;
        Ok(response.results)
    }

    /// Merge the orphan account into the canonical account. Returns the
    /// surviving account as reported by the merge response.
    pub async fn merge_user(&self, orphan_id: i64, canonical_id: i64) -> ClientResult<ZendeskUser> {
        let url = format!("{}/api/v2/users/{}/merge.json", self.base_url, orphan_id);
        let body = json!({ "user": { "id": canonical_id } });
        let response: UserResponse = self.put(&url, &body).await?;
        response
            .user
            .ok_or_else(|| ClientError::parse("merge response carried no user record"))
    }

    /// List the contact identities of an account.
    pub async fn list_identities(&self, user_id: i64) -> ClientResult<Vec<Identity>> {
        let url = format!("{}/api/v2/users/{}/identities.json", self.base_url, user_id);
        let response: IdentitiesResponse = self.get(&url, None).await?;
        Ok(response.identities)
    }

    /// Mark an identity as the account's primary. Returns the updated
    /// identity list so the caller can verify the flag took.
    pub async fn make_identity_primary(
        &self,
        user_id: i64,
        identity_id: i64,
    ) -> ClientResult<Vec<Identity>> {
        let url = format!(
            "{}/api/v2/users/{}/identities/{}/make_primary.json",
            self.base_url, user_id, identity_id
        );
        let response: IdentitiesResponse = self.put(&url, &json!({})).await?;
        Ok(response.identities)
    }

    /// Fetch an account by id. `None` when the account does not exist
    /// (404 or an `{"error": ...}` body).
    pub async fn show_user(&self, user_id: i64) -> ClientResult<Option<ZendeskUser>> {
        let url = format!("{}/api/v2/users/{}.json", self.base_url, user_id);
        match self.get::<UserResponse>(&url, None).await {
            Ok(response) => {
                if let Some(error) = response.error {
                    debug!(user_id, error, "show-account answered an error body");
                    return Ok(None);
                }
                Ok(response.user)
            }
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// First page of an account's requested tickets. `None` when the
    /// account is unknown to the ticket index (`RecordNotFound`).
    pub async fn requested_tickets(&self, user_id: i64) -> ClientResult<Option<TicketPage>> {
        let url = format!(
            "{}/api/v2/users/{}/tickets/requested.json",
            self.base_url, user_id
        );
        match self.get::<TicketPage>(&url, None).await {
            Ok(page) => Ok(Some(page)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Internal HTTP methods ─────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Option<(&str, &str)>,
    ) -> ClientResult<T> {
        let _guard = self.limiter.acquire().await?;
        debug!(%url, "zendesk GET");
        let mut builder = self.http.get(url);
        if let Some((key, value)) = query {
            builder = builder.query(&[(key, value)]);
        }
        let response = self.credentials.apply(builder).send().await?;
        self.handle_response(response).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> ClientResult<T> {
        let _guard = self.limiter.acquire().await?;
        debug!(%url, "zendesk PUT");
        let builder = self.http.put(url).json(body);
        let response = self.credentials.apply(builder).send().await?;
        self.handle_response(response).await
    }

    // ── Response handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClientError::parse(format!("unexpected response shape: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
            StatusCode::UNAUTHORIZED => Err(ClientError::Auth(body)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after_secs = ?retry_after, "zendesk rate limited the gateway");
                Err(ClientError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            _ => {
                let detail = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                Err(ClientError::Api {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }
}
