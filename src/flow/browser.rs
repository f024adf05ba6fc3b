//! Best-effort browser launch.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AuthError;

#[cfg(windows)]
const BROWSER_COMMANDS: &[&str] = &["explorer"];
#[cfg(not(windows))]
const BROWSER_COMMANDS: &[&str] = &["xdg-open", "google-chrome", "open"];

/// Opens the authorization URL for the user.
#[async_trait]
pub trait BrowserOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), AuthError>;
}

/// Launches the first available system browser command.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser;

#[async_trait]
impl BrowserOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<(), AuthError> {
        let mut failures = Vec::new();
        for bin in BROWSER_COMMANDS {
            match tokio::process::Command::new(bin).arg(url).status().await {
                Ok(status) if status.success() => {
                    debug!(command = bin, "opened browser");
                    return Ok(());
                }
                Ok(status) => failures.push(format!("{bin}: {status}")),
                Err(err) => failures.push(format!("{bin}: {err}")),
            }
        }
        Err(AuthError::Io(format!(
            "no browser command succeeded ({})",
            failures.join("; ")
        )))
    }
}

/// Never opens anything; the operator follows the logged URL.
#[derive(Debug, Clone, Default)]
pub struct ManualBrowser;

#[async_trait]
impl BrowserOpener for ManualBrowser {
    async fn open(&self, _url: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Fire and forget: failures only show up in the logs.
pub(crate) fn spawn_open(opener: Arc<dyn BrowserOpener>, url: String) {
    tokio::spawn(async move {
        if let Err(err) = opener.open(&url).await {
            warn!(error = %err, "error opening URL in browser, open it manually");
        }
    });
}
