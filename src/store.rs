use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::AuthError;
use crate::token::Token;

/// Persistence boundary for tokens, indexed by an opaque cache key.
///
/// `get` returns `Ok(None)` for a key that was never written and
/// [`AuthError::ExpiredToken`] for an entry past its expiry; a store never
/// hands back an expired token.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Token>, AuthError>;
    fn put(&self, key: &str, token: &Token) -> Result<(), AuthError>;
    fn clear(&self, key: &str) -> Result<(), AuthError>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_token_dir()
    }
}

/// File-backed token store: one JSON file per key, readable by the owner only.
///
/// # Example
/// ```no_run
/// use oauthflows::{FileTokenStore, Token, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// store.put("0123456789abcdef0123456789abcdef", &Token::bearer("access"))?;
/// # Ok::<(), oauthflows::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_token_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file holding `key`. Keys are limited to `[A-Za-z0-9_-]`.
    pub fn token_path(&self, key: &str) -> Result<PathBuf, AuthError> {
        validate_key(key)?;
        Ok(self.base_dir.join(format!("token.{key}.json")))
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<Token>, AuthError> {
        let path = self.token_path(key)?;
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let token: Token = serde_json::from_str(&raw).map_err(|err| {
            AuthError::Serialization(format!("cannot parse {}: {err}", path.display()))
        })?;
        if let Some(expiry) = token.expiry {
            if expiry <= Utc::now() {
                return Err(AuthError::ExpiredToken { expired_at: expiry });
            }
        }
        Ok(Some(token))
    }

    fn put(&self, key: &str, token: &Token) -> Result<(), AuthError> {
        let path = self.token_path(key)?;
        Self::ensure_parent(&path)?;
        let serialized = serde_json::to_vec_pretty(token)?;
        let mut file = open_private(&path)
            .map_err(|err| AuthError::Io(format!("failed to cache oauth token: {err}")))?;
        file.write_all(&serialized)?;
        file.sync_all()?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AuthError> {
        let path = self.token_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten files that already existed.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".oauthflows"))
        .unwrap_or_else(|| PathBuf::from(".oauthflows"))
}

fn validate_key(key: &str) -> Result<(), AuthError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(AuthError::Configuration(format!(
            "invalid token cache key {key:?}: only letters, digits, '-' and '_' are allowed"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(TokenStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn missing_key_is_absent_not_error() {
        let (_dir, store) = temp_store();
        assert!(store.get("never-written").unwrap().is_none());
    }

    #[test]
    fn token_round_trip_works() {
        let (_dir, store) = temp_store();
        let token = Token {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        };
        store.put("abc", &token).unwrap();
        let loaded = store.get("abc").unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn expired_entry_is_an_error() {
        let (_dir, store) = temp_store();
        let expired_at = Utc::now() - Duration::minutes(1);
        store
            .put("abc", &Token::bearer("stale").with_expiry(expired_at))
            .unwrap();
        let err = store.get("abc").unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken { .. }));
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let (_dir, store) = temp_store();
        fs::write(store.token_path("abc").unwrap(), "{not json").unwrap();
        assert!(matches!(
            store.get("abc"),
            Err(AuthError::Serialization(_))
        ));
    }

    #[test]
    fn file_is_named_after_the_key() {
        let (dir, store) = temp_store();
        store.put("abc123", &Token::bearer("x")).unwrap();
        assert!(dir.path().join("token.abc123.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        store.put("abc", &Token::bearer("x")).unwrap();
        let mode = fs::metadata(store.token_path("abc").unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_removes_token_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store.put("abc", &Token::bearer("x")).unwrap();
        store.clear("abc").unwrap();
        assert!(store.get("abc").unwrap().is_none());
        store.clear("abc").unwrap();
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.token_path("../../etc/passwd"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn distinct_keys_never_share_a_file() {
        let (dir, store) = temp_store();
        for key in ["a.b", "a/b", "", "..."] {
            assert!(matches!(
                store.put(key, &Token::bearer("x")),
                Err(AuthError::Configuration(_))
            ));
            assert!(matches!(store.get(key), Err(AuthError::Configuration(_))));
        }
        store.put("a-b", &Token::bearer("dash")).unwrap();
        store.put("a_b", &Token::bearer("underscore")).unwrap();
        assert_eq!(store.get("a-b").unwrap().unwrap().access_token, "dash");
        assert_eq!(store.get("a_b").unwrap().unwrap().access_token, "underscore");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
