//! Error type shared by the flow, the token sources and the stores.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while obtaining, caching or verifying OAuth2 tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Callback listener setup failed: {0}")]
    Bind(String),

    #[error("Authorization flow cancelled")]
    Cancelled,

    #[error("Authorization flow timed out after {after_secs}s")]
    TimedOut { after_secs: u64 },

    #[error("Callback listener error: {0}")]
    Callback(String),

    #[error("Token exchange error: {0}")]
    Exchange(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Token expired at {expired_at}")]
    ExpiredToken { expired_at: DateTime<Utc> },

    #[error(
        "Missing scopes, expected at least {requested:?} but got {granted:?}, missing {missing:?}"
    )]
    MissingScopes {
        requested: Vec<String>,
        granted: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Failed to verify scopes: {0}")]
    ScopeVerification(String),
}

impl AuthError {
    /// True when the token was verified and found to lack requested scopes.
    pub fn is_missing_scopes(&self) -> bool {
        matches!(self, Self::MissingScopes { .. })
    }

    /// True when the flow ended because the caller gave up waiting.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scopes_is_identifiable() {
        let err = AuthError::MissingScopes {
            requested: vec!["a".to_string(), "d".to_string()],
            granted: vec!["a".to_string()],
            missing: vec!["d".to_string()],
        };
        assert!(err.is_missing_scopes());
        assert!(!AuthError::ScopeVerification("boom".to_string()).is_missing_scopes());
        assert!(err.to_string().contains("missing [\"d\"]"));
    }

    #[test]
    fn timeouts_and_cancels_count_as_cancellation() {
        assert!(AuthError::Cancelled.is_cancellation());
        assert!(AuthError::TimedOut { after_secs: 3 }.is_cancellation());
        assert!(!AuthError::Exchange("nope".to_string()).is_cancellation());
    }

    #[test]
    fn io_errors_convert() {
        let err: AuthError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err, AuthError::Io(msg) if msg == "disk"));
    }
}
