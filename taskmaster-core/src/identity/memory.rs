//! In-process identity provider for tests and offline use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{is_valid_email, AuthError, IdentityProvider, MIN_PASSWORD_LEN};
use crate::models::Session;

#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    offline: bool,
    /// Report unknown users and wrong passwords alike as `InvalidCredential`.
    opaque_errors: bool,
    signed_out: Vec<String>,
}

struct Account {
    user_id: String,
    password: String,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Mimics providers with email enumeration protection.
    pub fn set_opaque_errors(&self, opaque: bool) {
        self.lock().opaque_errors = opaque;
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// User ids whose sessions were signed out, oldest first.
    pub fn signed_out(&self) -> Vec<String> {
        self.lock().signed_out.clone()
    }
}

impl Inner {
    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline {
            Err(AuthError::Network("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn new_token() -> String {
    format!("mem-{}", uuid::Uuid::new_v4())
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        self.lock().check_online()?;
        Ok(Session::anonymous(
            uuid::Uuid::new_v4().to_string(),
            new_token(),
        ))
    }

    async fn sign_in_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let inner = self.lock();
        inner.check_online()?;
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let key = email.to_lowercase();
        match inner.accounts.get(&key) {
            Some(account) if account.password == password => {
                Ok(Session::with_email(&account.user_id, key, new_token()))
            }
            Some(_) if inner.opaque_errors => Err(AuthError::InvalidCredential),
            Some(_) => Err(AuthError::WrongPassword),
            None if inner.opaque_errors => Err(AuthError::InvalidCredential),
            None => Err(AuthError::UserNotFound),
        }
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut inner = self.lock();
        inner.check_online()?;
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = email.to_lowercase();
        if inner.accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }

        let user_id = uuid::Uuid::new_v4().to_string();
        inner.accounts.insert(
            key.clone(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        Ok(Session::with_email(user_id, key, new_token()))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let mut inner = self.lock();
        inner.check_online()?;
        inner.signed_out.push(session.user_id.clone());
        Ok(())
    }
}
