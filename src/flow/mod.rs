//! Interactive authorization-code flow with a loopback redirect.
//!
//! One call to [`AuthorizationFlow::run`]:
//! 1. generates a fresh `state` nonce,
//! 2. binds a [`CallbackServer`] on an ephemeral local port,
//! 3. logs the authorization URL and opens it in a browser (best effort),
//! 4. waits for a state-valid callback carrying a code, cancellation or timeout,
//! 5. releases the listener and exchanges the code for a token.

pub mod browser;
pub mod callback;
pub mod exchange;
pub mod nonce;

pub use browser::{BrowserOpener, ManualBrowser, SystemBrowser};
pub use callback::CallbackServer;
pub use exchange::exchange_code;
pub use nonce::generate_nonce;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::token::Token;
use crate::util::timeout::with_timeout;

/// Default bound on how long the user has to complete authorization.
pub const DEFAULT_FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs the interactive browser flow for one client configuration.
///
/// # Example
/// ```no_run
/// use oauthflows::{AuthorizationFlow, OAuthConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), oauthflows::AuthError> {
/// let config = OAuthConfig::new("client-id", "client-secret").with_scopes(["openid"]);
/// let flow = AuthorizationFlow::new(config);
/// let token = flow.run(&CancellationToken::new()).await?;
/// println!("expires in {:?}", token.expires_in());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthorizationFlow {
    config: Arc<OAuthConfig>,
    http: reqwest::Client,
    opener: Arc<dyn BrowserOpener>,
    timeout: Duration,
}

impl AuthorizationFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            opener: Arc::new(SystemBrowser),
            timeout: DEFAULT_FLOW_TIMEOUT,
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_browser_opener(mut self, opener: Arc<dyn BrowserOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one full interactive authorization.
    ///
    /// Fails with [`AuthError::Bind`] if the listener cannot start,
    /// [`AuthError::Cancelled`] / [`AuthError::TimedOut`] if no valid callback
    /// arrives in time, and [`AuthError::Exchange`] if the provider rejects the
    /// code. The listener is released on every path.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Token, AuthError> {
        let state = generate_nonce();
        let mut server = CallbackServer::bind(state.clone()).await?;
        let redirect_uri = server.redirect_url();

        let auth_url = match self.config.authorization_url(&state, &redirect_uri) {
            Ok(url) => url,
            Err(err) => {
                server.shutdown().await;
                return Err(err);
            }
        };
        info!("Authorize this app at: {auth_url}");
        browser::spawn_open(self.opener.clone(), auth_url.to_string());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            result = with_timeout(self.timeout, server.wait_for_code()) => result,
        };
        server.shutdown().await;
        let code = outcome?;
        info!("Got authorization code, exchanging it for a token");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            result = exchange_code(&self.http, &self.config, &code, &redirect_uri) => result,
        }
    }
}
