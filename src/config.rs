//! OAuth2 client configuration (code > env > client secrets file).

use std::fmt;
use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::error::AuthError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/tokeninfo";

/// OAuth2 client identity, provider endpoints and requested scopes.
///
/// # Example
/// ```
/// use oauthflows::OAuthConfig;
///
/// let config = OAuthConfig::new("client-id", "client-secret")
///     .with_scopes(["openid", "profile"]);
/// assert_eq!(config.scopes, vec!["openid", "profile"]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthConfig {
    /// Client against the Google endpoints, with no scopes yet.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Load a client secrets file as downloaded from the provider console.
    pub fn from_client_secrets_file(
        path: impl AsRef<Path>,
        scopes: &[String],
    ) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|err| AuthError::Configuration(format!("cannot read {}: {err}", path.display())))?;
        Self::from_client_secrets_json(&raw, scopes).map_err(|err| match err {
            AuthError::Configuration(msg) => {
                AuthError::Configuration(format!("cannot parse config {}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse a `{"installed": {...}}` or `{"web": {...}}` credentials document.
    pub fn from_client_secrets_json(raw: &[u8], scopes: &[String]) -> Result<Self, AuthError> {
        let file: ClientSecretsFile = serde_json::from_slice(raw)
            .map_err(|err| AuthError::Configuration(err.to_string()))?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::Configuration("expected an \"installed\" or \"web\" section".to_string())
        })?;
        let config = Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            auth_url: secrets.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_url: secrets.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            scopes: scopes.to_vec(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables (`OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET`,
    /// `OAUTH_AUTH_URL`, `OAUTH_TOKEN_URL`, `OAUTH_SCOPES`), reading `.env` first.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();
        let client_id = std::env::var("OAUTH_CLIENT_ID")
            .map_err(|_| AuthError::Configuration("OAUTH_CLIENT_ID is not set".to_string()))?;
        let client_secret = std::env::var("OAUTH_CLIENT_SECRET").unwrap_or_default();
        let mut config = Self::new(client_id, client_secret);
        if let Ok(url) = std::env::var("OAUTH_AUTH_URL") {
            config.auth_url = url;
        }
        if let Ok(url) = std::env::var("OAUTH_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(raw) = std::env::var("OAUTH_SCOPES") {
            config.scopes = split_scopes(&raw);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Configuration("client_id is empty".to_string()));
        }
        for (name, value) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            Url::parse(value)
                .map_err(|err| AuthError::Configuration(format!("invalid {name} {value:?}: {err}")))?;
        }
        Ok(())
    }

    /// Authorization endpoint URL the user's browser is sent to.
    pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|err| AuthError::Configuration(format!("invalid auth_url: {err}")))?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", redirect_uri);
            if !self.scopes.is_empty() {
                params.append_pair("scope", &self.scopes.join(" "));
            }
            params.append_pair("state", state);
        }
        Ok(url)
    }
}

/// Split a scope list separated by whitespace or commas.
pub fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: String,
    #[serde(default)]
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}
