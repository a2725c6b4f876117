/// Technician model and database operations
///
/// Technicians are the field workers jobs get dispatched to. Each one is
/// backed by a profile in the same company.
///
/// # Status
///
/// ```text
/// available ──dispatch──▶ busy ──complete──▶ available
/// any ──PATCH /status──▶ offline | available | busy
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE technicians (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     profile_id UUID NOT NULL UNIQUE REFERENCES profiles(id) ON DELETE CASCADE,
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     skills TEXT[] NOT NULL DEFAULT '{}',
///     status technician_status NOT NULL DEFAULT 'available',
///     current_location JSONB,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor, PgPool};
use uuid::Uuid;

/// Technician availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "technician_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TechnicianStatus {
    /// Free to take a job
    Available,

    /// Working a dispatched job
    Busy,

    /// Off shift
    Offline,
}

impl TechnicianStatus {
    /// Converts status to string
    pub fn as_str(&self) -> &'static str {
        match self {
            TechnicianStatus::Available => "available",
            TechnicianStatus::Busy => "busy",
            TechnicianStatus::Offline => "offline",
        }
    }
}

/// Last reported GPS position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lng: f64,
}

/// Technician row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Technician {
    /// Unique technician ID
    pub id: Uuid,

    /// Backing profile
    pub profile_id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Trade skills (e.g. "hvac", "plumbing")
    pub skills: Vec<String>,

    /// Availability
    pub status: TechnicianStatus,

    /// Last reported position
    pub current_location: Option<Json<Location>>,

    /// When the technician was created
    pub created_at: DateTime<Utc>,

    /// When the technician was last updated
    pub updated_at: DateTime<Utc>,
}

/// Technician joined with its profile's display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TechnicianWithProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub technician: Technician,

    /// Profile full name
    pub full_name: String,

    /// Profile email
    pub email: Option<String>,
}

/// Input for creating a technician
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTechnician {
    /// Backing profile
    pub profile_id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Trade skills
    #[serde(default)]
    pub skills: Vec<String>,
}

const TECHNICIAN_COLUMNS: &str = "t.id, t.profile_id, t.company_id, t.skills, t.status, \
     t.current_location, t.created_at, t.updated_at";

impl Technician {
    /// Creates a technician in `available` status
    pub async fn create(pool: &PgPool, data: CreateTechnician) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Technician>(&format!(
            r#"
            INSERT INTO technicians AS t (profile_id, company_id, skills)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            TECHNICIAN_COLUMNS
        ))
        .bind(data.profile_id)
        .bind(data.company_id)
        .bind(data.skills)
        .fetch_one(pool)
        .await
    }

    /// Finds a technician by ID within a company
    pub async fn find_by_id_and_company(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Technician>(&format!(
            "SELECT {} FROM technicians t WHERE t.id = $1 AND t.company_id = $2",
            TECHNICIAN_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a company's technicians joined with profile names
    ///
    /// When `status` is set only technicians in that status are returned.
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
        status: Option<TechnicianStatus>,
    ) -> Result<Vec<TechnicianWithProfile>, sqlx::Error> {
        sqlx::query_as::<_, TechnicianWithProfile>(&format!(
            r#"
            SELECT {}, p.full_name, p.email
            FROM technicians t
            JOIN profiles p ON p.id = t.profile_id
            WHERE t.company_id = $1
              AND ($2::technician_status IS NULL OR t.status = $2)
            ORDER BY p.full_name ASC
            "#,
            TECHNICIAN_COLUMNS
        ))
        .bind(company_id)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Sets a technician's status
    ///
    /// Generic over the executor so dispatch/complete can run it inside
    /// their transaction.
    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
        status: TechnicianStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Technician>(&format!(
            r#"
            UPDATE technicians AS t
            SET status = $3, updated_at = NOW()
            WHERE t.id = $1 AND t.company_id = $2
            RETURNING {}
            "#,
            TECHNICIAN_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(status)
        .fetch_optional(executor)
        .await
    }

    /// Records a technician's current position
    pub async fn set_location(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
        location: Location,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Technician>(&format!(
            r#"
            UPDATE technicians AS t
            SET current_location = $3, updated_at = NOW()
            WHERE t.id = $1 AND t.company_id = $2
            RETURNING {}
            "#,
            TECHNICIAN_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(Json(location))
        .fetch_optional(pool)
        .await
    }
}
