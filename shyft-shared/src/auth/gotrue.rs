/// [`AuthProvider`] backed by the hosted GoTrue auth API
///
/// Every call sends the project's anon key in the `apikey` header. Calls on
/// behalf of a signed-in user add their access token as a bearer token.
///
/// # Endpoints
///
/// | Operation | Request |
/// |---|---|
/// | sign up | `POST /auth/v1/signup` |
/// | sign in | `POST /auth/v1/token?grant_type=password` |
/// | refresh | `POST /auth/v1/token?grant_type=refresh_token` |
/// | sign out | `POST /auth/v1/logout` |
/// | current user | `GET /auth/v1/user` |
/// | recovery email | `POST /auth/v1/recover?redirect_to=...` |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::provider::{
    AuthProvider, AuthResult, AuthServiceError, AuthSession, AuthUser, SignUpOutcome,
};

/// Client for a hosted GoTrue instance
#[derive(Clone)]
pub struct GoTrueAuth {
    http: Client,
    base_url: String,
    anon_key: String,
}

/// Sign-up answers with a session when confirmation is off, a bare user otherwise
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

impl GoTrueAuth {
    /// Creates a client for the project at `base_url` (e.g. `https://xyz.supabase.co`)
    pub fn new(http: Client, base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    /// Turns a non-success response into the matching error
    async fn error_from(response: Response, credentials: bool) -> AuthServiceError {
        let status = response.status();
        let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
        let message = error_message(&body).unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AuthServiceError::Unauthorized(message)
            }
            StatusCode::BAD_REQUEST if credentials => AuthServiceError::InvalidCredentials(message),
            s if s.is_client_error() => AuthServiceError::Rejected {
                status: s.as_u16(),
                message,
            },
            _ => {
                warn!(status = %status, %message, "Auth service returned an error");
                AuthServiceError::Upstream(message)
            }
        }
    }

    async fn token_grant(&self, grant_type: &str, body: JsonValue) -> AuthResult<AuthSession> {
        let response = self
            .request(self.http.post(self.url("/token")))
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, true).await);
        }

        Ok(response.json().await?)
    }
}

/// Pulls a human-readable message out of the service's error shapes
fn error_message(body: &JsonValue) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> AuthResult<SignUpOutcome> {
        debug!(%email, "Signing up user");

        let response = self
            .request(self.http.post(self.url("/signup")))
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            }),
            SignUpResponse::User(user) => Ok(SignUpOutcome {
                user,
                session: None,
            }),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        debug!(%email, "Signing in user");
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .request(self.http.post(self.url("/logout")))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AuthResult<AuthUser> {
        let response = self
            .request(self.http.get(self.url("/user")))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }

        Ok(response.json().await?)
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AuthResult<()> {
        debug!(%email, "Requesting password recovery email");

        let response = self
            .request(self.http.post(self.url("/recover")))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, false).await);
        }
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }
}
