use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are considered expired this long before their actual expiry.
pub const EXPIRY_DELTA_SECS: i64 = 10;

/// OAuth2 token issued by the authorization server.
///
/// Tokens are never mutated in place: a refreshed or newly issued token is a
/// new value replacing the old one.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use oauthflows::Token;
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     token_type: "Bearer".to_string(),
///     expiry: Some(Utc::now() + Duration::hours(1)),
/// };
/// assert!(token.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Bearer token without refresh token or expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// A token without expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.expiry
            .map(|expiry| expiry - Duration::seconds(EXPIRY_DELTA_SECS) <= Utc::now())
            .unwrap_or(false)
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Remaining lifetime, `None` when the token carries no expiry.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expiry.map(|expiry| expiry - Utc::now())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let kind = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{kind} {}", self.access_token)
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
