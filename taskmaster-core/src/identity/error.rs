use thiserror::Error;

/// Authentication failures. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Please enter an email and a password")]
    MissingCredentials,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("This email is already in use")]
    EmailInUse,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("No account exists for this email")]
    UserNotFound,

    #[error("Invalid sign-in credentials")]
    InvalidCredential,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Too many attempts. Please try again later")]
    RateLimited,

    #[error("Sign-in error: {0}")]
    Other(String),
}

/// Coarse grouping of [`AuthError`] for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCategory {
    WrongCredential,
    InvalidEmail,
    EmailInUse,
    WeakCredential,
    Network,
    RateLimited,
    Generic,
}

impl AuthError {
    /// Stable wire code, as used in server error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing-credentials",
            AuthError::WrongPassword => "wrong-password",
            AuthError::InvalidEmail => "invalid-email",
            AuthError::EmailInUse => "email-already-in-use",
            AuthError::WeakPassword => "weak-password",
            AuthError::UserNotFound => "user-not-found",
            AuthError::InvalidCredential => "invalid-credential",
            AuthError::Network(_) => "network-request-failed",
            AuthError::RateLimited => "too-many-requests",
            AuthError::Other(_) => "internal-error",
        }
    }

    /// Maps a wire code back to an error. Unknown codes keep their message.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            "missing-credentials" => AuthError::MissingCredentials,
            "wrong-password" => AuthError::WrongPassword,
            "invalid-email" => AuthError::InvalidEmail,
            "email-already-in-use" => AuthError::EmailInUse,
            "weak-password" => AuthError::WeakPassword,
            "user-not-found" => AuthError::UserNotFound,
            "invalid-credential" => AuthError::InvalidCredential,
            "network-request-failed" => AuthError::Network(message.into()),
            "too-many-requests" => AuthError::RateLimited,
            _ => AuthError::Other(message.into()),
        }
    }

    pub fn category(&self) -> AuthErrorCategory {
        match self {
            AuthError::WrongPassword | AuthError::UserNotFound | AuthError::InvalidCredential => {
                AuthErrorCategory::WrongCredential
            }
            AuthError::InvalidEmail => AuthErrorCategory::InvalidEmail,
            AuthError::EmailInUse => AuthErrorCategory::EmailInUse,
            AuthError::WeakPassword => AuthErrorCategory::WeakCredential,
            AuthError::Network(_) => AuthErrorCategory::Network,
            AuthError::RateLimited => AuthErrorCategory::RateLimited,
            AuthError::MissingCredentials | AuthError::Other(_) => AuthErrorCategory::Generic,
        }
    }

    /// Whether a failed sign-in should be retried as account creation.
    pub fn suggests_new_account(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::InvalidCredential)
    }
}
