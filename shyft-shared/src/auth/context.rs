/// Per-request authentication context
///
/// The API's auth middleware validates the bearer token with the auth
/// service, then stores an `AuthContext` in the request extensions.
///
/// # Example
///
/// ```
/// use shyft_shared::auth::context::bearer_token;
///
/// assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
/// ```

use uuid::Uuid;

use super::provider::{AuthServiceError, AuthUser};

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity returned by the auth service
    pub user: AuthUser,

    /// The bearer token the request carried
    pub access_token: String,
}

impl AuthContext {
    /// Creates a context for a validated token
    pub fn new(user: AuthUser, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }

    /// Auth-service user ID
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Email, if the identity has one
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
///
/// # Errors
///
/// `Unauthorized` when the header is absent, uses another scheme, or carries
/// an empty token.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthServiceError> {
    let header = header
        .ok_or_else(|| AuthServiceError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AuthServiceError::Unauthorized("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthServiceError::Unauthorized("Empty bearer token".to_string()));
    }
    Ok(token)
}
