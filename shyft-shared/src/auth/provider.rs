/// Hosted authentication service contract
///
/// Shyft never stores passwords or sessions. Sign-up, sign-in, token refresh
/// and bearer validation are all delegated to the hosted auth service; this
/// module defines the seam the API programs against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Error type for auth-service calls
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Email/password or refresh token rejected
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Bearer token missing, malformed, expired or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The service refused the request (duplicate email, weak password, ...)
    #[error("Auth service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure or unexpected response
    #[error("Auth service error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for AuthServiceError {
    fn from(err: reqwest::Error) -> Self {
        AuthServiceError::Upstream(err.to_string())
    }
}

/// Auth result type alias
pub type AuthResult<T> = Result<T, AuthServiceError>;

/// Identity as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable user ID
    pub id: Uuid,

    /// Primary email
    #[serde(default)]
    pub email: Option<String>,

    /// Free-form metadata supplied at sign-up (e.g. `full_name`)
    #[serde(default)]
    pub user_metadata: JsonValue,

    /// When the identity was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Reads a string field from `user_metadata`
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Token pair issued by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for API calls
    pub access_token: String,

    /// Token used to obtain a new session
    pub refresh_token: String,

    /// Access-token lifetime in seconds
    pub expires_in: i64,

    /// Always "bearer"
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Identity the session belongs to
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Result of a sign-up
///
/// `session` is `None` when the service requires email confirmation first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

/// Operations the API needs from the hosted auth service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates a new identity
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> AuthResult<SignUpOutcome>;

    /// Exchanges email/password for a session
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    /// Revokes the session behind an access token
    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;

    /// Validates an access token and returns its identity
    async fn get_user(&self, access_token: &str) -> AuthResult<AuthUser>;

    /// Sends a password-recovery email
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AuthResult<()>;

    /// Exchanges a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession>;
}
