//! OAuth2 credentials for command-line programs.
//!
//! Obtains tokens with the Authorization Code grant through a loopback
//! browser redirect, caches them on disk, reuses them in memory and checks
//! the scopes that were actually granted.
//!
//! # Quick Start
//!
//! ```no_run
//! use oauthflows::ClientBuilder;
//!
//! # async fn example() -> Result<(), oauthflows::AuthError> {
//! let scopes = vec!["openid".to_string(), "profile".to_string()];
//! let client = ClientBuilder::new()
//!     .with_client_secrets_file("/path/to/client_secret.json", &scopes)?
//!     .with_file_token_store()
//!     .build()
//!     .await?;
//! let token = client.token().await?;
//! println!("token type {}", token.token_type);
//! # Ok(())
//! # }
//! ```

pub mod cache_key;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod scopes;
pub mod source;
pub mod store;
pub mod token;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use cache_key::derive_cache_key;
pub use client::{AuthorizedClient, ClientBuilder};
pub use config::OAuthConfig;
pub use error::AuthError;
pub use flow::{AuthorizationFlow, BrowserOpener, ManualBrowser, SystemBrowser};
pub use scopes::{IntrospectedToken, ScopeVerifier};
pub use source::{
    CachedTokenSource, InteractiveTokenSource, ReuseTokenSource, StaticTokenSource, TokenSource,
};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::Token;
