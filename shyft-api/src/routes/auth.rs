/// Authentication endpoints
///
/// Credentials and sessions live in the hosted auth service; these handlers
/// forward to it and take care of Shyft's own onboarding (company and admin
/// profile) after sign-up.
///
/// # Endpoints
///
/// - `POST /auth/signup` - Create account, company and admin profile
/// - `POST /auth/login` - Exchange email/password for a session
/// - `POST /auth/logout` - Revoke the current session (bearer)
/// - `GET  /auth/me` - Current user, profile and company (bearer)
/// - `POST /auth/forgot-password` - Send a recovery email
/// - `POST /auth/refresh` - Exchange a refresh token for a new session

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shyft_shared::{
    auth::{
        context::AuthContext,
        provider::{AuthSession, AuthUser},
    },
    models::{company::Company, profile::Profile},
};
use tracing::{info, warn};
use validator::Validate;

use super::{data, onboard, Data};
use crate::{app::AppState, error::ApiResult};

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "full_name is required"))]
    pub full_name: String,

    /// Optional company name; derived from the email when absent
    #[validate(length(max = 255, message = "company_name must be at most 255 characters"))]
    pub company_name: Option<String>,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: AuthUser,

    /// Absent when the auth service requires email confirmation first
    pub session: Option<AuthSession>,

    pub profile: Profile,

    pub company: Company,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    /// Refresh token
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

/// Current-user response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: AuthUser,

    /// `None` until the user is onboarded
    pub profile: Option<Profile>,

    pub company: Option<Company>,
}

/// Generic acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/signup
/// Content-Type: application/json
///
/// {
///   "email": "dana@acme.test",
///   "password": "correct-horse",
///   "full_name": "Dana Reyes",
///   "company_name": "Acme Plumbing"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the auth service refused
///   (e.g. email already registered)
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<SignupResponse>>)> {
    let Json(req) = payload?;
    req.validate()?;

    let outcome = state
        .auth
        .sign_up(
            &req.email,
            &req.password,
            json!({ "full_name": req.full_name, "company_name": req.company_name }),
        )
        .await?;

    let (profile, company) = onboard(
        &state,
        outcome.user.id,
        Some(&req.email),
        Some(&req.full_name),
        req.company_name.as_deref(),
    )
    .await?;

    info!(user_id = %outcome.user.id, company_id = %company.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        data(SignupResponse {
            user: outcome.user,
            session: outcome.session,
            profile,
            company,
        }),
    ))
}

/// Log in
///
/// # Errors
///
/// - `401 Unauthorized`: Wrong email or password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Data<AuthSession>>> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state.auth.sign_in(&req.email, &req.password).await?;
    info!(user_id = %session.user.id, "User logged in");

    Ok(data(session))
}

/// Log out the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<MessageResponse>>> {
    state.auth.sign_out(&ctx.access_token).await?;
    info!(user_id = %ctx.user_id(), "User logged out");

    Ok(data(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Current user with profile and company
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<MeResponse>>> {
    let profile = state.store.find_profile_by_user(ctx.user_id()).await?;
    let company = match &profile {
        Some(p) => state.store.find_company(p.company_id).await?,
        None => None,
    };

    Ok(data(MeResponse {
        user: ctx.user,
        profile,
        company,
    }))
}

/// Request a password-recovery email
///
/// Answers 200 whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Data<MessageResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    let redirect_to = state.config.app_link("/reset-password");
    if let Err(e) = state.auth.send_password_reset(&req.email, &redirect_to).await {
        warn!(error = %e, "Password recovery request failed");
    }

    Ok(data(MessageResponse {
        message: "If that account exists, a reset link has been sent".to_string(),
    }))
}

/// Refresh a session
///
/// # Errors
///
/// - `401 Unauthorized`: Refresh token invalid or already used
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<Data<AuthSession>>> {
    let Json(req) = payload?;
    req.validate()?;

    let session = state.auth.refresh_session(&req.refresh_token).await?;
    Ok(data(session))
}
