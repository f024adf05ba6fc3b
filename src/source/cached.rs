use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::TokenSource;
use crate::error::AuthError;
use crate::store::TokenStore;
use crate::token::Token;

/// Consults a [`TokenStore`] before falling back to the inner source, and
/// writes freshly obtained tokens back under the same key.
///
/// An expired entry is treated as a cache miss (and logged). Any other store
/// error fails the call; a broken store is never silently bypassed.
pub struct CachedTokenSource<S> {
    key: String,
    store: Arc<dyn TokenStore>,
    inner: S,
}

impl<S: TokenSource> CachedTokenSource<S> {
    pub fn new(key: impl Into<String>, store: Arc<dyn TokenStore>, inner: S) -> Self {
        Self {
            key: key.into(),
            store,
            inner,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for CachedTokenSource<S> {
    async fn token(&self) -> Result<Token, AuthError> {
        match self.store.get(&self.key) {
            Ok(Some(token)) if token.is_valid() => {
                debug!(key = %self.key, "using cached token");
                return Ok(token);
            }
            Ok(Some(_)) => {
                debug!(key = %self.key, "cached token is about to expire, fetching a new one");
            }
            Ok(None) => debug!(key = %self.key, "no cached token"),
            Err(AuthError::ExpiredToken { expired_at }) => {
                warn!(key = %self.key, %expired_at, "cached token expired, fetching a new one");
            }
            Err(err) => return Err(err),
        }

        let token = self.inner.token().await?;
        self.store.put(&self.key, &token)?;
        Ok(token)
    }
}
