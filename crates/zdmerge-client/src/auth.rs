//! Zendesk API-token authentication.

use reqwest::RequestBuilder;

/// Credentials for the Zendesk API-token scheme: HTTP basic auth with
/// `{email}/token` as the username and the API token as the password.
///
/// The [`Debug`] impl redacts the token to prevent accidental credential
/// exposure in log output.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiCredentials {
    /// Agent email the token belongs to.
    pub email: String,
    /// API token.
    pub token: String,
}

impl ApiCredentials {
    /// Create credentials from an agent email and API token.
    #[must_use]
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }

    /// Apply basic auth to an outgoing request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(format!("{}/token", self.email), Some(&self.token))
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
