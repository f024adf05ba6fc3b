//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::AuthError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::TimedOut {
            after_secs: duration.as_secs(),
        }),
    }
}
