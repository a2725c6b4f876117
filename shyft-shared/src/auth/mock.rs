/// In-process [`AuthProvider`] for tests and local demos
///
/// Users, access tokens and refresh tokens live in a map. Tokens are random
/// UUID strings. Recovery requests are recorded instead of emailed so tests
/// can assert on them.
///
/// # Example
///
/// ```
/// use shyft_shared::auth::{mock::MockAuthProvider, provider::AuthProvider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = MockAuthProvider::new();
/// let (user, token) = auth.create_user("tech@acme.test", "hunter22").await;
/// assert_eq!(auth.get_user(&token).await?.id, user.id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::provider::{
    AuthProvider, AuthResult, AuthServiceError, AuthSession, AuthUser, SignUpOutcome,
};

const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Default)]
struct MockState {
    /// email → (user, password)
    users: HashMap<String, (AuthUser, String)>,
    /// access token → user id
    access_tokens: HashMap<String, Uuid>,
    /// refresh token → user id
    refresh_tokens: HashMap<String, Uuid>,
    /// (email, redirect_to) of every recovery request
    recoveries: Vec<(String, String)>,
}

impl MockState {
    fn user_by_id(&self, id: Uuid) -> Option<AuthUser> {
        self.users
            .values()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone())
    }

    fn issue_session(&mut self, user: AuthUser) -> AuthSession {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        self.access_tokens.insert(access_token.clone(), user.id);
        self.refresh_tokens.insert(refresh_token.clone(), user.id);

        AuthSession {
            access_token,
            refresh_token,
            expires_in: TOKEN_LIFETIME_SECS,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

/// Auth provider that never leaves the process
#[derive(Default)]
pub struct MockAuthProvider {
    state: Mutex<MockState>,
}

impl MockAuthProvider {
    /// Creates an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns it with a valid access token
    pub async fn create_user(&self, email: &str, password: &str) -> (AuthUser, String) {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: JsonValue::Null,
            created_at: Some(Utc::now()),
        };

        let mut state = self.state.lock().await;
        state
            .users
            .insert(email.to_string(), (user.clone(), password.to_string()));
        let session = state.issue_session(user.clone());
        (user, session.access_token)
    }

    /// Recovery requests seen so far as `(email, redirect_to)`
    pub async fn recovery_requests(&self) -> Vec<(String, String)> {
        self.state.lock().await.recoveries.clone()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> AuthResult<SignUpOutcome> {
        let mut state = self.state.lock().await;

        if state.users.contains_key(email) {
            return Err(AuthServiceError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        if password.len() < 6 {
            return Err(AuthServiceError::Rejected {
                status: 422,
                message: "Password should be at least 6 characters".to_string(),
            });
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: metadata,
            created_at: Some(Utc::now()),
        };
        state
            .users
            .insert(email.to_string(), (user.clone(), password.to_string()));
        let session = state.issue_session(user.clone());

        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let mut state = self.state.lock().await;

        let user = match state.users.get(email) {
            Some((user, stored)) if stored == password => user.clone(),
            _ => {
                return Err(AuthServiceError::InvalidCredentials(
                    "Invalid login credentials".to_string(),
                ))
            }
        };

        Ok(state.issue_session(user))
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        let user_id = state
            .access_tokens
            .remove(access_token)
            .ok_or_else(|| AuthServiceError::Unauthorized("invalid JWT".to_string()))?;
        state.refresh_tokens.retain(|_, id| *id != user_id);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AuthResult<AuthUser> {
        let state = self.state.lock().await;
        state
            .access_tokens
            .get(access_token)
            .and_then(|id| state.user_by_id(*id))
            .ok_or_else(|| AuthServiceError::Unauthorized("invalid JWT".to_string()))
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AuthResult<()> {
        self.state
            .lock()
            .await
            .recoveries
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let mut state = self.state.lock().await;

        let user = state
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|id| state.user_by_id(id))
            .ok_or_else(|| {
                AuthServiceError::InvalidCredentials("Invalid Refresh Token".to_string())
            })?;

        Ok(state.issue_session(user))
    }
}
