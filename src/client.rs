//! Authorized HTTP client assembled from a token-source chain.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cache_key::derive_cache_key;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::flow::{AuthorizationFlow, BrowserOpener, SystemBrowser, DEFAULT_FLOW_TIMEOUT};
use crate::scopes::ScopeVerifier;
use crate::source::{CachedTokenSource, InteractiveTokenSource, ReuseTokenSource, TokenSource};
use crate::store::{FileTokenStore, TokenStore, TokenStoreConfig};
use crate::token::Token;

/// Builder for [`AuthorizedClient`].
///
/// # Example
/// ```no_run
/// use oauthflows::ClientBuilder;
///
/// # async fn example() -> Result<(), oauthflows::AuthError> {
/// let scopes = vec!["openid".to_string(), "profile".to_string()];
/// let client = ClientBuilder::new()
///     .with_client_secrets_file("client_secret.json", &scopes)?
///     .with_file_token_store()
///     .build()
///     .await?;
/// let resp = client
///     .get("https://www.googleapis.com/oauth2/v1/userinfo?alt=json")
///     .await?
///     .send()
///     .await?;
/// println!("{}", resp.text().await?);
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Option<OAuthConfig>,
    store: Option<Arc<dyn TokenStore>>,
    fail_on_missing_scopes: bool,
    verifier: Option<ScopeVerifier>,
    opener: Arc<dyn BrowserOpener>,
    flow_timeout: Duration,
    cancel: CancellationToken,
    http: Option<reqwest::Client>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("token_store", &self.store.as_ref().map(|_| ".."))
            .field("fail_on_missing_scopes", &self.fail_on_missing_scopes)
            .field("verifier", &self.verifier)
            .field("flow_timeout", &self.flow_timeout)
            .finish()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            fail_on_missing_scopes: false,
            verifier: Some(ScopeVerifier::default()),
            opener: Arc::new(SystemBrowser),
            flow_timeout: DEFAULT_FLOW_TIMEOUT,
            cancel: CancellationToken::new(),
            http: None,
        }
    }

    /// Bring your own OAuth2 client configuration.
    pub fn with_config(mut self, config: OAuthConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load client configuration from a credentials file and request `scopes`.
    pub fn with_client_secrets_file(
        mut self,
        path: impl AsRef<Path>,
        scopes: &[String],
    ) -> Result<Self, AuthError> {
        self.config = Some(OAuthConfig::from_client_secrets_file(path, scopes)?);
        Ok(self)
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use the built-in file store in its default directory.
    pub fn with_file_token_store(self) -> Self {
        self.with_token_store(Arc::new(FileTokenStore::new_default()))
    }

    pub fn with_file_token_store_at(self, dir: impl Into<PathBuf>) -> Self {
        self.with_token_store(Arc::new(FileTokenStore::new(TokenStoreConfig::new(
            dir.into(),
        ))))
    }

    /// Make a verified lack of requested scopes fatal instead of a warning.
    pub fn fail_on_missing_scopes(mut self, fail: bool) -> Self {
        self.fail_on_missing_scopes = fail;
        self
    }

    pub fn with_introspection_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.verifier = Some(ScopeVerifier::new(endpoint));
        self
    }

    /// For providers without a tokeninfo endpoint.
    pub fn skip_scope_verification(mut self) -> Self {
        self.verifier = None;
        self
    }

    pub fn with_browser_opener(mut self, opener: Arc<dyn BrowserOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_flow_timeout(mut self, timeout: Duration) -> Self {
        self.flow_timeout = timeout;
        self
    }

    /// Cancelling `cancel` aborts any interactive flow in progress.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Compose the token-source chain, obtain a first token and check its scopes.
    pub async fn build(self) -> Result<AuthorizedClient, AuthError> {
        let config = self
            .config
            .ok_or_else(|| AuthError::Configuration("no oauth2 client configured".to_string()))?;
        config.validate()?;

        let http = self.http.unwrap_or_default();
        let cache_key = derive_cache_key(&config.client_id, &config.client_secret, &config.scopes);
        let scopes = config.scopes.clone();

        let flow = AuthorizationFlow::new(config)
            .with_http_client(http.clone())
            .with_browser_opener(self.opener)
            .with_timeout(self.flow_timeout);
        let interactive: Arc<dyn TokenSource> =
            Arc::new(InteractiveTokenSource::new(flow, self.cancel));
        let inner: Arc<dyn TokenSource> = match self.store {
            Some(store) => Arc::new(CachedTokenSource::new(
                cache_key.clone(),
                store,
                interactive,
            )),
            None => interactive,
        };
        let source: Arc<dyn TokenSource> = Arc::new(ReuseTokenSource::new(inner));

        let token = source.token().await?;

        if let Some(verifier) = &self.verifier {
            match verifier.verify(&token.access_token, &scopes).await {
                Ok(()) => {}
                Err(err) if err.is_missing_scopes() && !self.fail_on_missing_scopes => {
                    warn!(error = %err, "actual token lacks requested scopes");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(AuthorizedClient {
            http,
            source,
            cache_key,
        })
    }
}

/// HTTP client that authorizes every request with a token from its chain.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    source: Arc<dyn TokenSource>,
    cache_key: String,
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("cache_key", &self.cache_key)
            .finish()
    }
}

impl AuthorizedClient {
    /// Wrap an existing source, e.g. a custom chain.
    pub fn from_source(http: reqwest::Client, source: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            source,
            cache_key: String::new(),
        }
    }

    /// Current token; re-acquired through the chain once expired.
    pub async fn token(&self) -> Result<Token, AuthError> {
        self.source.token().await
    }

    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        self.source.clone()
    }

    /// Key under which tokens for this configuration are cached.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, AuthError> {
        let token = self.source.token().await?;
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, token.authorization_header()))
    }

    pub async fn get(&self, url: &str) -> Result<RequestBuilder, AuthError> {
        self.request(Method::GET, url).await
    }

    pub async fn post(&self, url: &str) -> Result<RequestBuilder, AuthError> {
        self.request(Method::POST, url).await
    }
}
