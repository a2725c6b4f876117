/// Job endpoints
///
/// Jobs are always scoped to the caller's company; a job of another company
/// answers 404 exactly like a missing one.
///
/// # Endpoints
///
/// - `GET    /jobs` - List jobs (filters: `status`, `priority`, `assigned_to`)
/// - `GET    /jobs/:id` - Get one job
/// - `POST   /jobs` - Create a job
/// - `PATCH  /jobs/:id` - Update fields
/// - `DELETE /jobs/:id` - Delete a job
/// - `POST   /jobs/:id/dispatch` - Assign to a technician
/// - `POST   /jobs/:id/complete` - Mark completed and free the technician

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shyft_shared::{
    auth::context::AuthContext,
    db::store::JobTransition,
    models::job::{
        CreateJob, JobFilter, JobPriority, JobStatus, JobWithTechnician, UpdateJob,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{data, optional_json, require_profile, Data};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Create job request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "customer_name is required"))]
    pub customer_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,

    pub customer_phone: Option<String>,

    pub customer_address: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title is required"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    pub priority: JobPriority,

    pub scheduled_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub amount: Option<f64>,
}

/// Update job request
///
/// Every field is optional; status transitions are not checked.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateJobRequest {
    #[validate(length(min = 1, max = 255, message = "customer_name must not be empty"))]
    pub customer_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,

    pub customer_phone: Option<String>,

    pub customer_address: Option<String>,

    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<JobStatus>,

    pub priority: Option<JobPriority>,

    pub assigned_to: Option<Uuid>,

    pub scheduled_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub amount: Option<f64>,
}

impl From<UpdateJobRequest> for UpdateJob {
    fn from(req: UpdateJobRequest) -> Self {
        UpdateJob {
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            customer_address: req.customer_address,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            scheduled_at: req.scheduled_at,
            amount: req.amount,
        }
    }
}

/// Dispatch request
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub technician_id: Uuid,
}

/// Complete request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteRequest {
    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub amount: Option<f64>,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub deleted: bool,
}

fn job_not_found() -> ApiError {
    ApiError::NotFound("Job not found".to_string())
}

async fn load_job(state: &AppState, company_id: Uuid, id: Uuid) -> ApiResult<JobWithTechnician> {
    state
        .store
        .find_job(company_id, id)
        .await?
        .ok_or_else(job_not_found)
}

fn technician_not_found() -> ApiError {
    ApiError::NotFound("Technician not found".to_string())
}

async fn ensure_technician(state: &AppState, company_id: Uuid, id: Uuid) -> ApiResult<()> {
    state
        .store
        .find_technician(company_id, id)
        .await?
        .map(|_| ())
        .ok_or_else(technician_not_found)
}

/// Maps a refused or missing transition onto its HTTP error
fn applied(transition: JobTransition) -> ApiResult<()> {
    match transition {
        JobTransition::Applied(_) => Ok(()),
        JobTransition::JobNotFound => Err(job_not_found()),
        JobTransition::TechnicianNotFound => Err(technician_not_found()),
        JobTransition::Refused(JobStatus::Cancelled) => {
            Err(ApiError::Conflict("Job is cancelled".to_string()))
        }
        JobTransition::Refused(status) => Err(ApiError::Conflict(format!(
            "Job is already {}",
            status.as_str()
        ))),
    }
}

/// List jobs
///
/// # Endpoint
///
/// ```text
/// GET /jobs?status=pending&priority=high&assigned_to=<uuid>
/// ```
///
/// Newest first, each joined with its technician.
pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    filter: Result<Query<JobFilter>, QueryRejection>,
) -> ApiResult<Json<Data<Vec<JobWithTechnician>>>> {
    let Query(filter) = filter?;
    let profile = require_profile(&state, &ctx).await?;

    let jobs = state.store.list_jobs(profile.company_id, &filter).await?;
    Ok(data(jobs))
}

/// Get one job
pub async fn get_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Data<JobWithTechnician>>> {
    let Path(id) = path?;
    let profile = require_profile(&state, &ctx).await?;
    Ok(data(load_job(&state, profile.company_id, id).await?))
}

/// Create a job
///
/// # Endpoint
///
/// ```text
/// POST /jobs
/// Content-Type: application/json
///
/// {
///   "customer_name": "Pat Doe",
///   "title": "Replace water heater",
///   "priority": "high"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `customer_name` or `title` missing
/// - `404 Not Found`: Caller has no profile
pub async fn create_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<JobWithTechnician>>)> {
    let Json(mut req) = payload?;
    req.customer_name = req.customer_name.trim().to_string();
    req.title = req.title.trim().to_string();
    req.validate()?;

    let profile = require_profile(&state, &ctx).await?;

    let job = state
        .store
        .create_job(CreateJob {
            company_id: profile.company_id,
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            customer_address: req.customer_address,
            title: req.title,
            description: req.description,
            priority: req.priority,
            scheduled_at: req.scheduled_at,
            amount: req.amount,
        })
        .await?;

    info!(
        job_id = %job.id,
        company_id = %job.company_id,
        priority = job.priority.as_str(),
        "Job created"
    );

    Ok((
        StatusCode::CREATED,
        data(JobWithTechnician {
            job,
            technician: None,
        }),
    ))
}

/// Update a job
///
/// Setting `assigned_to` directly is allowed but the technician must belong
/// to the caller's company.
pub async fn update_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> ApiResult<Json<Data<JobWithTechnician>>> {
    let Path(id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let profile = require_profile(&state, &ctx).await?;
    if let Some(technician_id) = req.assigned_to {
        ensure_technician(&state, profile.company_id, technician_id).await?;
    }

    state
        .store
        .update_job(profile.company_id, id, req.into())
        .await?
        .ok_or_else(job_not_found)?;

    Ok(data(load_job(&state, profile.company_id, id).await?))
}

/// Delete a job
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Data<DeleteResponse>>> {
    let Path(id) = path?;
    let profile = require_profile(&state, &ctx).await?;

    if !state.store.delete_job(profile.company_id, id).await? {
        return Err(job_not_found());
    }

    info!(job_id = %id, "Job deleted");
    Ok(data(DeleteResponse { id, deleted: true }))
}

/// Dispatch a job to a technician
///
/// # Endpoint
///
/// ```text
/// POST /jobs/:id/dispatch
/// Content-Type: application/json
///
/// { "technician_id": "uuid" }
/// ```
///
/// The job becomes `assigned` and the technician `busy` in one transaction.
///
/// # Errors
///
/// - `404 Not Found`: Unknown job or technician
/// - `409 Conflict`: Job is already completed or cancelled
pub async fn dispatch_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> ApiResult<Json<Data<JobWithTechnician>>> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let profile = require_profile(&state, &ctx).await?;
    let company_id = profile.company_id;

    applied(
        state
            .store
            .dispatch_job(company_id, id, req.technician_id)
            .await?,
    )?;

    info!(job_id = %id, technician_id = %req.technician_id, "Job dispatched");
    Ok(data(load_job(&state, company_id, id).await?))
}

/// Complete a job
///
/// # Endpoint
///
/// ```text
/// POST /jobs/:id/complete
/// Content-Type: application/json
///
/// { "amount": 240.0 }
/// ```
///
/// Stamps `completed_at`, records the amount when given and frees the
/// assigned technician. The body may be left out entirely; a body that is
/// sent must be JSON.
///
/// # Errors
///
/// - `400 Bad Request`: Body is not JSON or `amount` is not a number
/// - `404 Not Found`: Unknown job
/// - `409 Conflict`: Job was cancelled
pub async fn complete_job(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Data<JobWithTechnician>>> {
    let Path(id) = path?;
    let req: CompleteRequest = optional_json(&headers, &body)?;
    req.validate()?;

    let profile = require_profile(&state, &ctx).await?;
    let company_id = profile.company_id;

    applied(state.store.complete_job(company_id, id, req.amount).await?)?;

    info!(job_id = %id, amount = ?req.amount, "Job completed");
    Ok(data(load_job(&state, company_id, id).await?))
}
