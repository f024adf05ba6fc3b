//! CLI handlers for login, status, and logout.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{CredentialArgs, LoginArgs};
use crate::cache_key::derive_cache_key;
use crate::client::ClientBuilder;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::store::{FileTokenStore, TokenStore, TokenStoreConfig};

fn file_store(args: &CredentialArgs) -> FileTokenStore {
    match &args.token_dir {
        Some(dir) => FileTokenStore::new(TokenStoreConfig::new(dir.clone())),
        None => FileTokenStore::new_default(),
    }
}

fn cache_key(args: &CredentialArgs) -> Result<String, AuthError> {
    let config = OAuthConfig::from_client_secrets_file(&args.client_secrets, &args.scopes)?;
    Ok(derive_cache_key(
        &config.client_id,
        &config.client_secret,
        &config.scopes,
    ))
}

/// Handle `oauthflows login`.
pub async fn handle_login(args: &LoginArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut builder = ClientBuilder::new()
        .with_client_secrets_file(&args.credentials.client_secrets, &args.credentials.scopes)?
        .fail_on_missing_scopes(args.fail_on_missing_scopes)
        .with_flow_timeout(Duration::from_secs(args.timeout_secs))
        .with_cancellation(cancel);
    if !args.no_cache {
        builder = builder.with_token_store(std::sync::Arc::new(file_store(&args.credentials)));
    }

    let client = builder.build().await?;
    let token = client.token().await?;
    println!("✅ Authorized");
    if let Some(expiry) = token.expiry {
        println!("   Expires: {}", expiry.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if !args.no_cache {
        let store = file_store(&args.credentials);
        println!("   Cached:  {}", store.token_path(client.cache_key())?.display());
    }
    Ok(())
}

/// Handle `oauthflows status`.
pub async fn handle_status(args: &CredentialArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = file_store(args);
    let key = cache_key(args)?;
    println!("🔐 Token cache {}", store.token_path(&key)?.display());
    match store.get(&key) {
        Ok(Some(token)) => match token.expiry {
            Some(expiry) => println!(
                "  ✅ Cached token (expires {})",
                expiry.format("%Y-%m-%d %H:%M")
            ),
            None => println!("  ✅ Cached token (no expiry)"),
        },
        Ok(None) => println!("  ❌ No cached token"),
        Err(AuthError::ExpiredToken { expired_at }) => println!(
            "  ⚠️  Cached token expired at {}",
            expired_at.format("%Y-%m-%d %H:%M")
        ),
        Err(e) => println!("  ⚠️  Error: {e}"),
    }
    Ok(())
}

/// Handle `oauthflows logout`.
pub async fn handle_logout(args: &CredentialArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = file_store(args);
    let key = cache_key(args)?;
    let path = store.token_path(&key)?;
    store.clear(&key)?;
    println!("✅ Removed cached token {}", path.display());
    Ok(())
}
