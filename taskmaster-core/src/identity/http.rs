//! Identity provider backed by the taskmaster-server auth endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AuthError, IdentityProvider};
use crate::models::Session;
use crate::remote::{build_http_url, ApiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Body of the sign-in and sign-up requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub is_anonymous: bool,
    pub token: String,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session {
            user_id: response.user_id,
            email: response.email,
            is_anonymous: response.is_anonymous,
            sync_enabled: true,
            token: response.token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    server_url: String,
    http: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: Option<CredentialsRequest>,
    ) -> Result<Session, AuthError> {
        let mut request = self
            .http
            .post(build_http_url(&self.server_url, path))
            .timeout(REQUEST_TIMEOUT);
        if let Some(credentials) = &credentials {
            request = request.json(credentials);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Other(e.to_string()))?;
        Ok(body.into())
    }
}

async fn error_from_response(response: reqwest::Response) -> AuthError {
    let status = response.status();
    match response.json::<ApiError>().await {
        Ok(body) => AuthError::from_code(&body.error, body.message),
        Err(_) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
        Err(_) => AuthError::Other(format!("Server returned status {}", status)),
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_anonymously(&self) -> Result<Session, AuthError> {
        self.authenticate("/v1/auth/anonymous", None).await
    }

    async fn sign_in_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/v1/auth/sign-in", Some(credentials))
            .await
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/v1/auth/sign-up", Some(credentials))
            .await
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .http
            .post(build_http_url(&self.server_url, "/v1/auth/sign-out"))
            .bearer_auth(&session.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
