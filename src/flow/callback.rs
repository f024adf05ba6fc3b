//! One-shot loopback listener receiving the authorization redirect.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::nonce::constant_time_eq;
use crate::error::AuthError;

const SUCCESS_HTML: &str = "<html><body><h1>Success \u{1F973}</h1><p>Authorized. You may close this window.</p></body></html>";
const ERROR_HTML: &str =
    "<html><body><h1>Authorization failed</h1><p>This request was not accepted.</p></body></html>";

/// How long shutdown waits for in-flight responses before aborting the server.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct CallbackState {
    expected_state: String,
    code_tx: Mutex<Option<oneshot::Sender<String>>>,
}

impl CallbackState {
    fn take_sender(&self) -> Option<oneshot::Sender<String>> {
        match self.code_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Loopback HTTP listener bound to an OS-assigned port on 127.0.0.1.
///
/// Hands off exactly one authorization code: the first request whose `state`
/// matches and which carries a `code`. Every other request is answered with
/// an error status and leaves the listener waiting. The listener is released
/// by [`CallbackServer::shutdown`], or on drop.
pub struct CallbackServer {
    addr: SocketAddr,
    code_rx: Option<oneshot::Receiver<String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    pub async fn bind(expected_state: String) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|err| AuthError::Bind(format!("127.0.0.1:0 ({err})")))?;
        let addr = listener
            .local_addr()
            .map_err(|err| AuthError::Bind(format!("local_addr failed: {err}")))?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = callback_router(Arc::new(CallbackState {
            expected_state,
            code_tx: Mutex::new(Some(code_tx)),
        }));

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                warn!(error = %err, "oauth callback listener stopped with an error");
            }
        });
        debug!(%addr, "oauth callback listener started");

        Ok(Self {
            addr,
            code_rx: Some(code_rx),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the listener; used verbatim as the redirect URI.
    pub fn redirect_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the winning authorization code.
    pub async fn wait_for_code(&mut self) -> Result<String, AuthError> {
        let code_rx = self
            .code_rx
            .take()
            .ok_or_else(|| AuthError::Callback("authorization code already taken".to_string()))?;
        code_rx
            .await
            .map_err(|_| AuthError::Callback("listener closed before a code arrived".to_string()))
    }

    /// Stop accepting, let in-flight responses finish, then release the port.
    ///
    /// Returns `false` when the listener had to be aborted after the grace period.
    pub async fn shutdown(self) -> bool {
        self.shutdown_within(SHUTDOWN_GRACE).await
    }

    async fn shutdown_within(mut self, grace: Duration) -> bool {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                warn!(addr = %self.addr, "oauth callback listener did not drain in time, aborting");
                task.abort();
                return false;
            }
        }
        debug!(addr = %self.addr, "oauth callback listener stopped");
        true
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn callback_router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/", any(handle_callback))
        .fallback(handle_unrelated)
        .with_state(state)
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let received = params.get("state").map(String::as_str).unwrap_or_default();
    if !constant_time_eq(received.as_bytes(), state.expected_state.as_bytes()) {
        warn!("oauth callback state doesn't match, rejecting request");
        return rejected();
    }

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or_default();
        warn!(%error, %description, "authorization server returned an error, still waiting");
        return rejected();
    }

    let Some(code) = params.get("code").filter(|code| !code.is_empty()) else {
        warn!("oauth callback carries no code, rejecting request");
        return rejected();
    };

    let delivered = state
        .take_sender()
        .is_some_and(|code_tx| code_tx.send(code.clone()).is_ok());
    if !delivered {
        warn!("authorization code already accepted, rejecting extra callback");
        return rejected();
    }
    debug!("authorization code received");
    (StatusCode::OK, Html(SUCCESS_HTML)).into_response()
}

async fn handle_unrelated() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn rejected() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(ERROR_HTML)).into_response()
}
