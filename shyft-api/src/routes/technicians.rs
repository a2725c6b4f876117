/// Technician endpoints
///
/// # Endpoints
///
/// - `GET   /technicians` - All technicians of the company
/// - `GET   /technicians/available` - Only `available` ones
/// - `POST  /technicians` - Register a profile as technician
/// - `PATCH /technicians/:id/status` - Set availability
/// - `PATCH /technicians/:id/location` - Report GPS position

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shyft_shared::{
    auth::context::AuthContext,
    models::technician::{
        CreateTechnician, Location, Technician, TechnicianStatus, TechnicianWithProfile,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{data, require_profile, Data};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Create technician request
#[derive(Debug, Deserialize)]
pub struct CreateTechnicianRequest {
    /// Profile to register; must belong to the caller's company
    pub profile_id: Uuid,

    #[serde(default)]
    pub skills: Vec<String>,
}

/// Status update request
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TechnicianStatus,
}

/// Location update request
#[derive(Debug, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "lat must be within -90..=90"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "lng must be within -180..=180"))]
    pub lng: f64,
}

fn technician_not_found() -> ApiError {
    ApiError::NotFound("Technician not found".to_string())
}

/// List all technicians
pub async fn list_technicians(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<Vec<TechnicianWithProfile>>>> {
    let profile = require_profile(&state, &ctx).await?;
    let technicians = state
        .store
        .list_technicians(profile.company_id, None)
        .await?;
    Ok(data(technicians))
}

/// List technicians free to take a job
pub async fn list_available(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<Vec<TechnicianWithProfile>>>> {
    let profile = require_profile(&state, &ctx).await?;
    let technicians = state
        .store
        .list_technicians(profile.company_id, Some(TechnicianStatus::Available))
        .await?;
    Ok(data(technicians))
}

/// Register a technician
///
/// # Endpoint
///
/// ```text
/// POST /technicians
/// Content-Type: application/json
///
/// { "profile_id": "uuid", "skills": ["plumbing", "hvac"] }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Profile is not in the caller's company
/// - `409 Conflict`: Profile is already a technician
pub async fn create_technician(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<CreateTechnicianRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<Technician>>)> {
    let Json(req) = payload?;
    let profile = require_profile(&state, &ctx).await?;

    state
        .store
        .find_profile(profile.company_id, req.profile_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    let skills = req
        .skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let technician = state
        .store
        .create_technician(CreateTechnician {
            profile_id: req.profile_id,
            company_id: profile.company_id,
            skills,
        })
        .await?;

    info!(technician_id = %technician.id, profile_id = %req.profile_id, "Technician created");
    Ok((StatusCode::CREATED, data(technician)))
}

/// Set a technician's availability
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<Data<Technician>>> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let profile = require_profile(&state, &ctx).await?;

    let technician = state
        .store
        .set_technician_status(profile.company_id, id, req.status)
        .await?
        .ok_or_else(technician_not_found)?;

    info!(technician_id = %id, status = technician.status.as_str(), "Technician status changed");
    Ok(data(technician))
}

/// Record a technician's position
///
/// # Errors
///
/// - `400 Bad Request`: Coordinates out of range
/// - `404 Not Found`: Unknown technician
pub async fn update_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> ApiResult<Json<Data<Technician>>> {
    let Path(id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let profile = require_profile(&state, &ctx).await?;

    let technician = state
        .store
        .set_technician_location(
            profile.company_id,
            id,
            Location {
                lat: req.lat,
                lng: req.lng,
            },
        )
        .await?
        .ok_or_else(technician_not_found)?;
    Ok(data(technician))
}
