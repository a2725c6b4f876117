/// Dashboard endpoints
///
/// Each handler loads the company's rows once and folds them with
/// `shyft_shared::stats`.
///
/// # Endpoints
///
/// - `GET /dashboard/stats` - Job, technician and revenue totals
/// - `GET /dashboard/team` - Technicians with their open job counts
/// - `GET /dashboard/revenue-chart?months=N` - Monthly revenue, oldest first

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use shyft_shared::{
    auth::context::AuthContext,
    stats::{self, DashboardStats, RevenueBucket, TeamMember},
};

use super::{data, require_profile, Data};
use crate::{app::AppState, error::ApiResult};

/// Revenue chart query
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    /// Number of months, clamped to 1..=24 (default 6)
    pub months: Option<u32>,
}

/// Headline numbers
///
/// # Response
///
/// ```json
/// {
///   "data": {
///     "total_jobs": 42,
///     "pending_jobs": 5,
///     "active_jobs": 7,
///     "completed_jobs": 28,
///     "total_technicians": 6,
///     "available_technicians": 3,
///     "total_revenue": 18250.0,
///     "monthly_revenue": 2140.0
///   }
/// }
/// ```
pub async fn stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<DashboardStats>>> {
    let profile = require_profile(&state, &ctx).await?;

    let jobs = state.store.list_company_jobs(profile.company_id).await?;
    let technicians = state
        .store
        .list_technicians(profile.company_id, None)
        .await?;

    Ok(data(stats::dashboard_stats(&jobs, &technicians, Utc::now())))
}

/// Team overview
pub async fn team(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Data<Vec<TeamMember>>>> {
    let profile = require_profile(&state, &ctx).await?;

    let technicians = state
        .store
        .list_technicians(profile.company_id, None)
        .await?;
    let jobs = state.store.list_company_jobs(profile.company_id).await?;

    Ok(data(stats::team_overview(technicians, &jobs)))
}

/// Monthly revenue chart
pub async fn revenue_chart(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> ApiResult<Json<Data<Vec<RevenueBucket>>>> {
    let Query(query) = query?;
    let profile = require_profile(&state, &ctx).await?;

    let jobs = state.store.list_company_jobs(profile.company_id).await?;
    let months = stats::clamp_months(query.months);

    Ok(data(stats::revenue_chart(&jobs, months, Utc::now())))
}
