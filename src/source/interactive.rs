use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::TokenSource;
use crate::error::AuthError;
use crate::flow::AuthorizationFlow;
use crate::token::Token;

/// Runs a full interactive authorization on every call.
pub struct InteractiveTokenSource {
    flow: AuthorizationFlow,
    cancel: CancellationToken,
}

impl InteractiveTokenSource {
    pub fn new(flow: AuthorizationFlow, cancel: CancellationToken) -> Self {
        Self { flow, cancel }
    }
}

#[async_trait]
impl TokenSource for InteractiveTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        self.flow.run(&self.cancel).await
    }
}
