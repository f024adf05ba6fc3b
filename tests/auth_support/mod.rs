#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use oauthflows::{AuthError, BrowserOpener, Token, TokenSource, TokenStore};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, Token>>,
    puts: AtomicUsize,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, token: Token) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), token);
    }

    pub fn peek(&self, key: &str) -> Option<Token> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<Token>, AuthError> {
        match self.peek(key) {
            Some(token) => match token.expiry {
                Some(expired_at) if expired_at <= Utc::now() => {
                    Err(AuthError::ExpiredToken { expired_at })
                }
                _ => Ok(Some(token)),
            },
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, token: &Token) -> Result<(), AuthError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.seed(key, token.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// Store whose reads or writes fail with an I/O error.
pub struct BrokenTokenStore {
    pub fail_get: bool,
    pub fail_put: bool,
}

impl TokenStore for BrokenTokenStore {
    fn get(&self, _key: &str) -> Result<Option<Token>, AuthError> {
        if self.fail_get {
            return Err(AuthError::Io("disk on fire".to_string()));
        }
        Ok(None)
    }

    fn put(&self, _key: &str, _token: &Token) -> Result<(), AuthError> {
        if self.fail_put {
            return Err(AuthError::Io("read-only filesystem".to_string()));
        }
        Ok(())
    }

    fn clear(&self, _key: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Token sources
// ---------------------------------------------------------------------------

/// Hands out tokens from a queue and counts calls.
#[derive(Default)]
pub struct ScriptedSource {
    tokens: Mutex<VecDeque<Token>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: Mutex::new(tokens.into_iter().collect()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for ScriptedSource {
    async fn token(&self) -> Result<Token, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.tokens
            .lock()
            .expect("source lock poisoned")
            .pop_front()
            .ok_or_else(|| AuthError::Exchange("script exhausted".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Browsers
// ---------------------------------------------------------------------------

/// Follows the authorization URL back to the loopback listener, the way the
/// provider would redirect after the user consents.
pub struct CallbackBrowser {
    code: String,
    noisy: bool,
    opened: Mutex<Vec<String>>,
    statuses: Mutex<Vec<u16>>,
}

impl CallbackBrowser {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            noisy: false,
            opened: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        }
    }

    /// Send forged, incomplete and unrelated requests before the real one.
    pub fn noisy(mut self) -> Self {
        self.noisy = true;
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }

    pub fn statuses(&self) -> Vec<u16> {
        self.statuses.lock().expect("browser lock poisoned").clone()
    }

    /// The last response may land just after the flow returns.
    pub async fn wait_for_statuses(&self, count: usize) -> Vec<u16> {
        for _ in 0..100 {
            let statuses = self.statuses();
            if statuses.len() >= count {
                return statuses;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.statuses()
    }

    async fn hit(&self, url: String) -> Result<(), AuthError> {
        let status = reqwest::get(url).await?.status().as_u16();
        self.statuses
            .lock()
            .expect("browser lock poisoned")
            .push(status);
        Ok(())
    }
}

#[async_trait]
impl BrowserOpener for CallbackBrowser {
    async fn open(&self, url: &str) -> Result<(), AuthError> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());
        let params = query_map(url);
        let redirect = params["redirect_uri"].clone();
        let state = params["state"].clone();

        if self.noisy {
            self.hit(format!("{redirect}/favicon.ico")).await?;
            self.hit(format!("{redirect}/?state=forged&code=EVIL")).await?;
            self.hit(format!("{redirect}/?state={state}")).await?;
            self.hit(format!(
                "{redirect}/?state={state}&error=access_denied&error_description=nope"
            ))
            .await?;
        }
        self.hit(format!("{redirect}/?state={state}&code={}", self.code))
            .await
    }
}

/// Records the URL without navigating anywhere.
#[derive(Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<String>>,
    cancel_on_open: Option<CancellationToken>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `cancel` as soon as the browser is asked to open a URL.
    pub fn cancelling(cancel: CancellationToken) -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            cancel_on_open: Some(cancel),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }
}

#[async_trait]
impl BrowserOpener for RecordingBrowser {
    async fn open(&self, url: &str) -> Result<(), AuthError> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());
        if let Some(cancel) = &self.cancel_on_open {
            cancel.cancel();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn query_map(url: &str) -> HashMap<String, String> {
    Url::parse(url)
        .expect("valid url")
        .query_pairs()
        .into_owned()
        .collect()
}

pub fn form_map(body: &[u8]) -> HashMap<String, String> {
    let body = String::from_utf8(body.to_vec()).expect("utf-8 form body");
    query_map(&format!("http://localhost/?{body}"))
}

pub fn scopes(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn fresh_token(access_token: &str) -> Token {
    Token::bearer(access_token).with_expiry(Utc::now() + chrono::Duration::hours(1))
}
