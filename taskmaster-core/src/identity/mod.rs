//! Session and identity handling.
//!
//! An [`IdentityProvider`] talks to the authentication service. The
//! [`SessionManager`] wraps it with local credential checks, the
//! sign-in-or-create fallback, session persistence, and a watch channel
//! that announces every login and logout to the sync engine.

mod error;
mod http;
mod memory;

pub use error::{AuthError, AuthErrorCategory};
pub use http::{AuthResponse, CredentialsRequest, HttpIdentityProvider};
pub use memory::MemoryIdentityProvider;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::local_store::{keys, LocalStore};
use crate::models::Session;
use crate::status::StatusReporter;

pub const MIN_PASSWORD_LEN: usize = 6;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError>;

    async fn sign_in_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Revokes the session's credential on the service side.
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Basic shape check: `local@domain.tld` without whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Checks credentials before any provider call.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Owns the current session and announces changes.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: LocalStore,
    status: StatusReporter,
    tx: watch::Sender<Option<Session>>,
}

impl SessionManager {
    /// Creates a manager, restoring any session persisted by a previous run.
    pub fn new(provider: Arc<dyn IdentityProvider>, store: LocalStore, status: StatusReporter) -> Self {
        let restored: Option<Session> = store.load_or(keys::SESSION, None);
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.user_id, "restored session");
        }
        let (tx, _) = watch::channel(restored);
        Self {
            provider,
            store,
            status,
            tx,
        }
    }

    /// Receiver that yields the session on every login and `None` on logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn login_skipped(&self) -> bool {
        self.store.flag(keys::SKIP_LOGIN)
    }

    /// Whether the user should be asked to sign in.
    pub fn needs_login(&self) -> bool {
        self.current().is_none() && !self.login_skipped()
    }

    /// Continues in local-only mode without asking again.
    pub fn skip_login(&self) {
        self.store.set_flag(keys::SKIP_LOGIN, true);
        self.status.success("Working in local mode");
    }

    pub async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        self.status.syncing("Signing in...");
        let result = self.provider.sign_in_anonymously().await;
        self.finish_sign_in(result)
    }

    /// Signs in, creating the account when the provider reports that it
    /// does not exist.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let email = email.trim();
        validate_credentials(email, password)?;

        self.status.syncing("Signing in...");
        let result = match self.provider.sign_in_password(email, password).await {
            Ok(session) => Ok(session),
            Err(e) if e.suggests_new_account() => {
                tracing::info!(code = e.code(), "sign-in rejected, trying account creation");
                match self.provider.create_account(email, password).await {
                    // The account exists, so the original rejection stands.
                    Err(AuthError::EmailInUse) => Err(e),
                    other => other,
                }
            }
            Err(e) => Err(e),
        };
        self.finish_sign_in(result)
    }

    /// Ends the session locally. A provider-side failure is returned but
    /// the local session is cleared regardless.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current() else {
            return Ok(());
        };

        self.store.remove(keys::SESSION);
        self.tx.send_replace(None);
        tracing::info!(user_id = %session.user_id, "signed out");

        if let Err(e) = self.provider.sign_out(&session).await {
            tracing::warn!(error = %e, "provider sign-out failed");
            return Err(e);
        }
        Ok(())
    }

    fn finish_sign_in(&self, result: Result<Session, AuthError>) -> Result<Session, AuthError> {
        match result {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, anonymous = session.is_anonymous, "signed in");
                self.store.save(keys::SESSION, &session);
                self.store.remove(keys::SKIP_LOGIN);
                self.status.success(format!("Signed in as {}", session.label()));
                self.tx.send_replace(Some(session.clone()));
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(code = e.code(), "sign-in failed");
                self.status.error(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusKind;
    use tempfile::TempDir;

    fn manager(provider: &MemoryIdentityProvider) -> (SessionManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let manager = SessionManager::new(
            Arc::new(provider.clone()),
            store,
            StatusReporter::new(),
        );
        (manager, temp_dir)
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@@example.com"));
    }

    #[tokio::test]
    async fn test_pre_validation_skips_provider() {
        let provider = MemoryIdentityProvider::new();
        provider.set_offline(true);
        let (manager, _temp) = manager(&provider);

        assert_eq!(
            manager.sign_in_with_password("", "secret1").await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            manager.sign_in_with_password("a@b.co", "12345").await.unwrap_err(),
            AuthError::WeakPassword
        );
    }

    #[tokio::test]
    async fn test_unknown_user_creates_account() {
        let provider = MemoryIdentityProvider::new();
        let (manager, _temp) = manager(&provider);
        let mut rx = manager.subscribe();

        let session = manager
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(provider.account_count(), 1);
        assert!(!session.is_anonymous);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&session));
    }

    #[tokio::test]
    async fn test_invalid_credential_falls_back_to_creation() {
        let provider = MemoryIdentityProvider::new();
        provider.set_opaque_errors(true);
        let (manager, _temp) = manager(&provider);

        manager
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(provider.account_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_for_existing_account() {
        let provider = MemoryIdentityProvider::new();
        provider.create_account("ada@example.com", "secret1").await.unwrap();
        let (manager, _temp) = manager(&provider);

        let err = manager
            .sign_in_with_password("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::WrongPassword);

        provider.set_opaque_errors(true);
        let err = manager
            .sign_in_with_password("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert_eq!(err.category(), AuthErrorCategory::WrongCredential);
        assert_eq!(provider.account_count(), 1);
        assert_eq!(manager.status.current().unwrap().kind, StatusKind::Error);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let provider = MemoryIdentityProvider::new();
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        let first = SessionManager::new(Arc::new(provider.clone()), store.clone(), StatusReporter::new());
        let session = first.sign_in_anonymously().await.unwrap();

        let second = SessionManager::new(Arc::new(provider.clone()), store, StatusReporter::new());
        assert_eq!(second.current(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_when_provider_fails() {
        let provider = MemoryIdentityProvider::new();
        let (manager, _temp) = manager(&provider);
        manager.sign_in_anonymously().await.unwrap();

        provider.set_offline(true);
        assert!(manager.sign_out().await.is_err());
        assert!(manager.current().is_none());
        assert!(!manager.store.exists(keys::SESSION));
    }

    #[tokio::test]
    async fn test_skip_login_until_next_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let (manager, _temp) = manager(&provider);
        assert!(manager.needs_login());

        manager.skip_login();
        assert!(!manager.needs_login());
        assert!(manager.login_skipped());

        manager.sign_in_anonymously().await.unwrap();
        assert!(!manager.login_skipped());
    }
}
