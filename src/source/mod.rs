//! Token sources: a single capability with interchangeable providers.
//!
//! The chain used by [`crate::ClientBuilder`] is, outer to inner:
//! [`ReuseTokenSource`] → [`CachedTokenSource`] → [`InteractiveTokenSource`].

mod cached;
mod interactive;
mod reuse;

pub use cached::CachedTokenSource;
pub use interactive::InteractiveTokenSource;
pub use reuse::ReuseTokenSource;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::token::Token;

/// Produces a current token on demand.
///
/// Implementations must be safe to call repeatedly and must never return a
/// token that is already past its expiry.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token, AuthError>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn token(&self) -> Result<Token, AuthError> {
        (**self).token().await
    }
}

/// Always hands out the same token; useful for pre-issued credentials.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        match self.token.expiry {
            Some(expired_at) if self.token.is_expired() => {
                Err(AuthError::ExpiredToken { expired_at })
            }
            _ => Ok(self.token.clone()),
        }
    }
}
