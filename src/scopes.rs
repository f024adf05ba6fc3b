//! Post-acquisition check of the scopes actually granted to a token.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::GOOGLE_TOKENINFO_URL;
use crate::error::AuthError;

/// Upper bound for one introspection round trip.
pub const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Token metadata returned by the tokeninfo endpoint. Only `scope` is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntrospectedToken {
    #[serde(default)]
    pub issued_to: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub access_type: String,
}

/// Asks the token-issuing authority which scopes a token really carries.
///
/// Whether a missing scope is fatal is up to the caller: [`ScopeVerifier::verify`]
/// returns [`AuthError::MissingScopes`] for "verified and insufficient" and
/// [`AuthError::ScopeVerification`] for "could not verify".
#[derive(Debug, Clone)]
pub struct ScopeVerifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl Default for ScopeVerifier {
    fn default() -> Self {
        Self::new(GOOGLE_TOKENINFO_URL)
    }
}

impl ScopeVerifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: INTROSPECTION_TIMEOUT,
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Bound for one introspection round trip, applied per request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn introspect(&self, access_token: &str) -> Result<IntrospectedToken, AuthError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("access_token", access_token)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                AuthError::ScopeVerification(format!(
                    "failed to introspect access token at {:?}: {err}",
                    self.endpoint
                ))
            })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|err| {
            AuthError::ScopeVerification(format!(
                "failed to read access token introspection: {err}"
            ))
        })?;
        if !status.is_success() {
            return Err(AuthError::ScopeVerification(format!(
                "introspection endpoint returned status {status}"
            )));
        }
        serde_json::from_str(&body).map_err(|err| {
            AuthError::ScopeVerification(format!(
                "failed to parse access token introspection: {err}"
            ))
        })
    }

    /// Check that every requested scope was granted.
    pub async fn verify(&self, access_token: &str, requested: &[String]) -> Result<(), AuthError> {
        let info = self.introspect(access_token).await?;
        let granted = split_granted(&info.scope);
        let missing = missing_scopes(requested, &granted);
        if missing.is_empty() {
            debug!(scopes = ?requested, "all requested scopes granted");
            return Ok(());
        }
        Err(AuthError::MissingScopes {
            requested: requested.to_vec(),
            granted,
            missing,
        })
    }
}

/// Split the space-delimited scope string of an introspection response.
pub fn split_granted(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// `requested − granted`, in request order, without duplicates.
pub fn missing_scopes(requested: &[String], granted: &[String]) -> Vec<String> {
    let granted: HashSet<&str> = granted.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|scope| !granted.contains(scope.as_str()))
        .filter(|scope| seen.insert(scope.as_str()))
        .cloned()
        .collect()
}
