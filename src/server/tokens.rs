//! Bearer token storage for authenticated sessions.
//!
//! Tokens are issued on sign-in, stay valid until they expire or the client
//! signs out, and are persisted to `tokens.json` so restarts keep clients
//! signed in.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default session lifetime.
pub const DEFAULT_EXPIRY_DAYS: i64 = 30;

/// Data associated with a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TokenStore {
    /// Where tokens are persisted; `None` keeps them in memory only.
    path: Option<PathBuf>,
    tokens: RwLock<HashMap<String, TokenData>>,
    default_expiry: Duration,
}

impl TokenStore {
    /// Creates an in-memory store.
    pub fn new(expiry_days: i64) -> Self {
        Self {
            path: None,
            tokens: RwLock::new(HashMap::new()),
            default_expiry: Duration::days(expiry_days),
        }
    }

    /// Opens the store persisted in `data_dir`, dropping expired tokens.
    pub fn open(data_dir: &Path, expiry_days: i64) -> Self {
        let path = data_dir.join("tokens.json");
        let mut tokens: HashMap<String, TokenData> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        let now = Utc::now();
        tokens.retain(|_, data| data.expires_at > now);
        tracing::info!("Loaded {} session token(s)", tokens.len());

        Self {
            path: Some(path),
            tokens: RwLock::new(tokens),
            default_expiry: Duration::days(expiry_days),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TokenData>> {
        self.tokens.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TokenData>> {
        self.tokens.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issues a token for a user. Returns the token string (32 bytes,
    /// base64url encoded).
    pub fn create_token(&self, user_id: &str, email: Option<&str>, is_anonymous: bool) -> String {
        self.create_token_with_expiry(user_id, email, is_anonymous, self.default_expiry)
    }

    pub fn create_token_with_expiry(
        &self,
        user_id: &str,
        email: Option<&str>,
        is_anonymous: bool,
        expiry: Duration,
    ) -> String {
        let token = generate_token();
        let data = TokenData {
            user_id: user_id.to_string(),
            email: email.map(str::to_string),
            is_anonymous,
            expires_at: Utc::now() + expiry,
        };

        let mut tokens = self.write();
        tokens.insert(token.clone(), data);
        self.persist(&tokens);
        token
    }

    /// Returns the token's data if it is known and not expired.
    pub fn validate(&self, token: &str) -> Option<TokenData> {
        let data = self.read().get(token).cloned()?;
        if Utc::now() >= data.expires_at {
            self.revoke(token);
            return None;
        }
        Some(data)
    }

    /// Forgets a token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        let mut tokens = self.write();
        let removed = tokens.remove(token).is_some();
        if removed {
            self.persist(&tokens);
        }
        removed
    }

    /// Removes all expired tokens. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut tokens = self.write();
        let now = Utc::now();

        let before = tokens.len();
        tokens.retain(|_, data| data.expires_at > now);
        let removed = before - tokens.len();
        if removed > 0 {
            self.persist(&tokens);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn persist(&self, tokens: &HashMap<String, TokenData>) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_vec(tokens)
            .map_err(std::io::Error::other)
            .and_then(|bytes| {
                let temp_path = path.with_extension("json.tmp");
                std::fs::write(&temp_path, bytes)?;
                std::fs::rename(&temp_path, path)
            });
        if let Err(e) = result {
            tracing::warn!("Failed to persist tokens to {}: {}", path.display(), e);
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_DAYS)
    }
}

/// Generates a secure random token.
///
/// Returns 32 random bytes encoded as base64url (no padding).
fn generate_token() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_token_returns_unique() {
        let store = TokenStore::default();

        let token1 = store.create_token("u1", None, true);
        let token2 = store.create_token("u2", Some("b@example.com"), false);

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43); // 32 bytes base64url = 43 chars
    }

    #[test]
    fn test_validate_is_repeatable() {
        let store = TokenStore::default();
        let token = store.create_token("u1", Some("a@example.com"), false);

        let data = store.validate(&token).unwrap();
        assert_eq!(data.user_id, "u1");
        assert_eq!(data.email.as_deref(), Some("a@example.com"));
        assert!(store.validate(&token).is_some());
        assert!(store.validate("nonexistent-token").is_none());
    }

    #[test]
    fn test_expired_token_is_rejected_and_removed() {
        let store = TokenStore::default();
        let token = store.create_token_with_expiry("u1", None, true, Duration::seconds(-1));

        assert!(store.validate(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_revoke() {
        let store = TokenStore::default();
        let token = store.create_token("u1", None, true);

        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
        assert!(store.validate(&token).is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = TokenStore::default();
        store.create_token_with_expiry("a", None, true, Duration::seconds(-1));
        store.create_token_with_expiry("b", None, true, Duration::seconds(-1));
        store.create_token("c", None, true);

        assert_eq!(store.len(), 3);
        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_tokens_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let token = {
            let store = TokenStore::open(temp_dir.path(), DEFAULT_EXPIRY_DAYS);
            store.create_token("u1", None, true)
        };

        let reopened = TokenStore::open(temp_dir.path(), DEFAULT_EXPIRY_DAYS);
        assert_eq!(reopened.validate(&token).unwrap().user_id, "u1");
    }

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
