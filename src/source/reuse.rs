use async_trait::async_trait;
use tokio::sync::Mutex;

use super::TokenSource;
use crate::error::AuthError;
use crate::token::Token;

/// Keeps the last token in memory and only asks the inner source again once
/// that token is no longer valid.
///
/// Concurrent callers are serialized, so an expired token triggers a single
/// inner fetch.
pub struct ReuseTokenSource<S> {
    current: Mutex<Option<Token>>,
    inner: S,
}

impl<S: TokenSource> ReuseTokenSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            current: Mutex::new(None),
            inner,
        }
    }

    /// Start from an already obtained token.
    pub fn with_token(inner: S, token: Token) -> Self {
        Self {
            current: Mutex::new(Some(token)),
            inner,
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for ReuseTokenSource<S> {
    async fn token(&self) -> Result<Token, AuthError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        let token = self.inner.token().await?;
        if let (Some(expired_at), true) = (token.expiry, token.is_expired()) {
            return Err(AuthError::ExpiredToken { expired_at });
        }
        *current = Some(token.clone());
        Ok(token)
    }
}
