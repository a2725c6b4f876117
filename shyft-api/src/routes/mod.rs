/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-up, login and session endpoints backed by the auth service
/// - `jobs`: Job CRUD, dispatch and completion
/// - `technicians`: Technician roster, status and location
/// - `dashboard`: Aggregated stats, team overview and revenue chart
/// - `billing`: Plans, subscription state, checkout and portal sessions
/// - `webhooks`: Stripe webhook receiver
///
/// Successful responses wrap their payload as `{ "data": ... }`.

pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod health;
pub mod jobs;
pub mod technicians;
pub mod webhooks;

use axum::{
    body::Bytes,
    http::{header, HeaderMap},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shyft_shared::{
    auth::context::AuthContext,
    models::{
        company::{Company, CreateCompany},
        profile::{CreateProfile, Profile, ProfileRole},
    },
};
use tracing::info;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Wraps a payload in the success envelope
pub fn data<T: Serialize>(value: T) -> Json<Data<T>> {
    Json(Data { data: value })
}

/// Parses a JSON body that may be left out
///
/// An empty body yields `T::default()`. A non-empty body must be sent as
/// JSON and must deserialize into `T`; otherwise the request is rejected
/// with 400 before any handler logic runs.
pub(crate) fn optional_json<T>(headers: &HeaderMap, body: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    if !has_json_content_type(headers) {
        return Err(ApiError::BadRequest(
            "Expected request with `Content-Type: application/json`".to_string(),
        ));
    }

    let Json(value) = Json::<T>::from_bytes(body)?;
    Ok(value)
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(mime) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
    else {
        return false;
    };

    let mime = mime.trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Resolves the caller's profile
///
/// # Errors
///
/// `404 Profile not found` when the user has not been onboarded.
pub(crate) async fn require_profile(state: &AppState, ctx: &AuthContext) -> ApiResult<Profile> {
    state
        .store
        .find_profile_by_user(ctx.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// Resolves the caller's company through their profile
pub(crate) async fn require_company(
    state: &AppState,
    ctx: &AuthContext,
) -> ApiResult<(Profile, Company)> {
    let profile = require_profile(state, ctx).await?;
    let company = state
        .store
        .find_company(profile.company_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Company not found".to_string()))?;
    Ok((profile, company))
}

/// Default company name for a user who didn't choose one
fn default_company_name(email: Option<&str>) -> String {
    match email.and_then(|e| e.split('@').next()).filter(|l| !l.is_empty()) {
        Some(local) => format!("{}'s Company", local),
        None => "My Company".to_string(),
    }
}

/// Creates a company and its first admin profile for a new user
pub(crate) async fn onboard(
    state: &AppState,
    user_id: uuid::Uuid,
    email: Option<&str>,
    full_name: Option<&str>,
    company_name: Option<&str>,
) -> ApiResult<(Profile, Company)> {
    let name = company_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_company_name(email));

    let company = state.store.create_company(CreateCompany { name }).await?;

    let profile = state
        .store
        .create_profile(CreateProfile {
            user_id,
            company_id: company.id,
            full_name: full_name
                .map(str::to_string)
                .or_else(|| email.map(str::to_string))
                .unwrap_or_default(),
            email: email.map(str::to_string),
            role: ProfileRole::Admin,
        })
        .await?;

    info!(%user_id, company_id = %company.id, "Onboarded new company");
    Ok((profile, company))
}
