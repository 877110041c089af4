use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated identity that can sync with the remote store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,
    /// Bearer credential presented to the remote service.
    pub token: String,
}

fn default_sync_enabled() -> bool {
    true
}

impl Session {
    pub fn anonymous(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            is_anonymous: true,
            sync_enabled: true,
            token: token.into(),
        }
    }

    pub fn with_email(
        user_id: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: Some(email.into()),
            is_anonymous: false,
            sync_enabled: true,
            token: token.into(),
        }
    }

    /// Human-readable account label.
    pub fn label(&self) -> &str {
        match &self.email {
            Some(email) if !self.is_anonymous => email,
            _ => "Anonymous user",
        }
    }
}

// Keep the token out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("is_anonymous", &self.is_anonymous)
            .field("sync_enabled", &self.sync_enabled)
            .finish_non_exhaustive()
    }
}
