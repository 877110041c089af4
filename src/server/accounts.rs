//! Email/password accounts.
//!
//! Accounts are kept in `accounts.automerge` in the data directory:
//!
//! ```text
//! {
//!   "user@example.com": {
//!     "user_id": "5f0c...",
//!     "salt": "base64...",
//!     "password_hash": "hex sha256(salt || password)",
//!     "created_at": "2024-01-01T00:00:00Z"
//!   },
//!   ...
//! }
//! ```
//!
//! Repeated failed sign-ins for one email are throttled.

use automerge::{transaction::Transactable, AutoCommit, ObjType, ReadDoc, ROOT};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use taskmaster_core::identity::{is_valid_email, validate_credentials, AuthError};

/// Failed sign-ins allowed per email within [`FAILED_ATTEMPT_WINDOW`].
pub const MAX_FAILED_ATTEMPTS: usize = 5;
pub const FAILED_ATTEMPT_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    salt: String,
    password_hash: String,
}

impl Account {
    fn verify(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

#[derive(Debug)]
pub enum AccountStoreError {
    IoError(PathBuf, std::io::Error),
    AutomergeError(String),
}

impl std::fmt::Display for AccountStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStoreError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            AccountStoreError::AutomergeError(e) => write!(f, "Automerge error: {}", e),
        }
    }
}

impl std::error::Error for AccountStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccountStoreError::IoError(_, e) => Some(e),
            AccountStoreError::AutomergeError(_) => None,
        }
    }
}

/// Accounts indexed by lowercase email.
pub struct AccountStore {
    /// `None` keeps accounts in memory only.
    path: Option<PathBuf>,
    doc: AutoCommit,
    accounts: HashMap<String, Account>,
    failures: HashMap<String, Vec<Instant>>,
}

impl AccountStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: AutoCommit::new(),
            accounts: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    /// Loads accounts from the data directory.
    ///
    /// A missing file starts an empty store. A corrupt file is logged and
    /// also starts empty; it is only overwritten by the next sign-up.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("accounts.automerge");

        let doc = match std::fs::read(&path) {
            Ok(bytes) => match AutoCommit::load(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                    AutoCommit::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No accounts.automerge found, starting with 0 accounts");
                AutoCommit::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                AutoCommit::new()
            }
        };

        let mut accounts = HashMap::new();
        for email in doc.keys(ROOT) {
            if let Some(account) = parse_account(&doc, &email) {
                accounts.insert(email, account);
            }
        }
        tracing::info!("Loaded {} account(s)", accounts.len());

        Self {
            path: Some(path),
            doc,
            accounts,
            failures: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, email: &str) -> Option<&Account> {
        self.accounts.get(&email.trim().to_lowercase())
    }

    /// Creates an account.
    pub fn sign_up(&mut self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = email.trim().to_lowercase();
        validate_credentials(&email, password)?;
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if self.accounts.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let salt = generate_salt();
        let account = Account {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(&salt, password),
            salt,
        };

        self.write_account(&account)
            .map_err(|e| AuthError::Other(e.to_string()))?;
        self.accounts.insert(email, account.clone());
        tracing::info!(user_id = %account.user_id, "account created");
        Ok(account)
    }

    /// Checks credentials.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if self.is_throttled(&email) {
            return Err(AuthError::RateLimited);
        }

        let Some(account) = self.accounts.get(&email) else {
            self.record_failure(&email);
            return Err(AuthError::UserNotFound);
        };
        if !account.verify(password) {
            self.record_failure(&email);
            return Err(AuthError::WrongPassword);
        }

        let account = account.clone();
        self.failures.remove(&email);
        Ok(account)
    }

    fn is_throttled(&mut self, email: &str) -> bool {
        let Some(attempts) = self.failures.get_mut(email) else {
            return false;
        };
        attempts.retain(|at| at.elapsed() < FAILED_ATTEMPT_WINDOW);
        attempts.len() >= MAX_FAILED_ATTEMPTS
    }

    fn record_failure(&mut self, email: &str) {
        self.failures
            .entry(email.to_string())
            .or_default()
            .push(Instant::now());
    }

    fn write_account(&mut self, account: &Account) -> Result<(), AccountStoreError> {
        let am = |e: automerge::AutomergeError| AccountStoreError::AutomergeError(e.to_string());

        let obj = self
            .doc
            .put_object(ROOT, account.email.as_str(), ObjType::Map)
            .map_err(am)?;
        self.doc
            .put(&obj, "user_id", account.user_id.as_str())
            .map_err(am)?;
        self.doc.put(&obj, "salt", account.salt.as_str()).map_err(am)?;
        self.doc
            .put(&obj, "password_hash", account.password_hash.as_str())
            .map_err(am)?;
        self.doc
            .put(&obj, "created_at", Utc::now().to_rfc3339())
            .map_err(am)?;

        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = self.doc.save();
        let temp_path = path.with_extension("automerge.tmp");
        std::fs::write(&temp_path, bytes)
            .map_err(|e| AccountStoreError::IoError(temp_path.clone(), e))?;
        std::fs::rename(&temp_path, path).map_err(|e| AccountStoreError::IoError(path.clone(), e))
    }
}

fn parse_account(doc: &AutoCommit, email: &str) -> Option<Account> {
    let (_, obj) = doc.get(ROOT, email).ok()??;
    let field = |name: &str| {
        doc.get(&obj, name)
            .ok()
            .flatten()
            .and_then(|(v, _)| v.into_string().ok())
    };

    Some(Account {
        user_id: field("user_id")?,
        email: email.to_string(),
        salt: field("salt")?,
        password_hash: field("password_hash")?,
    })
}

fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    STANDARD.encode(bytes)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sign_up_then_sign_in() {
        let mut store = AccountStore::in_memory();
        let created = store.sign_up("Alice@Example.com", "secret1").unwrap();
        assert_eq!(created.email, "alice@example.com");

        let signed_in = store.sign_in("alice@example.com", "secret1").unwrap();
        assert_eq!(signed_in.user_id, created.user_id);
    }

    #[test]
    fn test_sign_in_errors() {
        let mut store = AccountStore::in_memory();
        store.sign_up("a@example.com", "secret1").unwrap();

        assert_eq!(
            store.sign_in("a@example.com", "wrong!!").unwrap_err(),
            AuthError::WrongPassword
        );
        assert_eq!(
            store.sign_in("b@example.com", "secret1").unwrap_err(),
            AuthError::UserNotFound
        );
        assert_eq!(
            store.sign_in("", "").unwrap_err(),
            AuthError::MissingCredentials
        );
    }

    #[test]
    fn test_sign_up_errors() {
        let mut store = AccountStore::in_memory();
        store.sign_up("a@example.com", "secret1").unwrap();

        assert_eq!(
            store.sign_up("a@example.com", "secret2").unwrap_err(),
            AuthError::EmailInUse
        );
        assert_eq!(
            store.sign_up("not-an-email", "secret1").unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(
            store.sign_up("c@example.com", "123").unwrap_err(),
            AuthError::WeakPassword
        );
    }

    #[test]
    fn test_repeated_failures_are_throttled() {
        let mut store = AccountStore::in_memory();
        store.sign_up("a@example.com", "secret1").unwrap();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                store.sign_in("a@example.com", "nope123").unwrap_err(),
                AuthError::WrongPassword
            );
        }
        assert_eq!(
            store.sign_in("a@example.com", "secret1").unwrap_err(),
            AuthError::RateLimited
        );
    }

    #[test]
    fn test_accounts_persist() {
        let temp_dir = TempDir::new().unwrap();
        let user_id = {
            let mut store = AccountStore::load(temp_dir.path());
            store.sign_up("a@example.com", "secret1").unwrap().user_id
        };

        let mut store = AccountStore::load(temp_dir.path());
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.sign_in("a@example.com", "secret1").unwrap().user_id,
            user_id
        );
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("accounts.automerge"), b"garbage").unwrap();

        let store = AccountStore::load(temp_dir.path());
        assert!(store.is_empty());
    }

    #[test]
    fn test_hash_depends_on_salt() {
        assert_ne!(hash_password("a", "pw"), hash_password("b", "pw"));
        assert_eq!(hash_password("a", "pw").len(), 64);
    }
}
