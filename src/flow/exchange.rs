//! Authorization-code grant against the provider's token endpoint.

use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::token::Token;

/// Exchange an authorization code for a token.
///
/// `redirect_uri` must be the exact value sent in the authorization request.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<Token, AuthError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", config.client_id.as_str()),
    ];
    if !config.client_secret.is_empty() {
        form.push(("client_secret", config.client_secret.as_str()));
    }

    let resp = client
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|err| AuthError::Exchange(format!("token request failed: {err}")))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|err| AuthError::Exchange(format!("token response read failed: {err}")))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<TokenErrorResponse>(&body)
            .ok()
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {description}", e.error),
                None => e.error,
            })
            .unwrap_or_else(|| format!("status {status}"));
        return Err(AuthError::Exchange(format!(
            "token endpoint rejected the code ({detail})"
        )));
    }

    parse_token_response(&body)
}

fn parse_token_response(body: &str) -> Result<Token, AuthError> {
    let payload: TokenResponse = serde_json::from_str(body)
        .map_err(|err| AuthError::InvalidResponse(format!("token response json invalid: {err}")))?;
    let access_token = payload.access_token.trim().to_string();
    if access_token.is_empty() {
        return Err(AuthError::InvalidResponse(
            "token response missing access_token".to_string(),
        ));
    }
    let expiry = payload
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| {
            Duration::try_seconds(secs)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .ok_or_else(|| {
                    AuthError::InvalidResponse(format!("token expires_in out of range: {secs}"))
                })
        })
        .transpose()?;
    Ok(Token {
        access_token,
        refresh_token: payload.refresh_token.filter(|t| !t.is_empty()),
        token_type: payload
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string()),
        expiry,
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    token_type: Option<String>,
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Some providers send `expires_in` as a string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
