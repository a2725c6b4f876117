/// Storage trait shared by the PostgreSQL and in-memory backends
///
/// Handlers only see `dyn Store`. Every query that touches tenant data takes
/// the caller's `company_id`, so a row from another company is reported as
/// absent rather than leaked.
///
/// # Implementations
///
/// - [`PgStore`](super::postgres::PgStore): production backend over sqlx
/// - [`MemoryStore`](super::memory::MemoryStore): process-local backend for
///   tests and local demos

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    company::{Company, CreateCompany, UpdateCompany},
    job::{CreateJob, Job, JobFilter, JobStatus, JobWithTechnician, UpdateJob},
    profile::{CreateProfile, Profile},
    technician::{CreateTechnician, Location, Technician, TechnicianStatus, TechnicianWithProfile},
};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row the operation depends on is missing
    #[error("Record not found")]
    NotFound,

    /// A uniqueness or foreign-key constraint rejected the write
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.constraint() {
                Some(constraint) => StoreError::Conflict(constraint.to_string()),
                None => StoreError::Database(db_err.to_string()),
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Storage result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a guarded job transition (dispatch or complete)
///
/// The status guard is evaluated in the same write as the transition, so a
/// concurrent cancel or completion cannot slip in between check and update.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    /// The transition committed
    Applied(Job),
    /// No such job in the company
    JobNotFound,
    /// No such technician in the company; nothing was written
    TechnicianNotFound,
    /// The job's current status does not allow the transition
    Refused(JobStatus),
}

/// Relational storage used by the API handlers
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the backend answers
    async fn ping(&self) -> StoreResult<()>;

    async fn create_company(&self, data: CreateCompany) -> StoreResult<Company>;

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>>;

    async fn find_company_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> StoreResult<Option<Company>>;

    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>>;

    async fn create_profile(&self, data: CreateProfile) -> StoreResult<Profile>;

    /// Looks up the profile of an auth-service user
    ///
    /// `None` means the user has not been onboarded yet.
    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;

    async fn find_profile(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn create_technician(&self, data: CreateTechnician) -> StoreResult<Technician>;

    async fn find_technician(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Technician>>;

    async fn list_technicians(
        &self,
        company_id: Uuid,
        status: Option<TechnicianStatus>,
    ) -> StoreResult<Vec<TechnicianWithProfile>>;

    async fn set_technician_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: TechnicianStatus,
    ) -> StoreResult<Option<Technician>>;

    async fn set_technician_location(
        &self,
        company_id: Uuid,
        id: Uuid,
        location: Location,
    ) -> StoreResult<Option<Technician>>;

    async fn create_job(&self, data: CreateJob) -> StoreResult<Job>;

    async fn find_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<JobWithTechnician>>;

    async fn list_jobs(
        &self,
        company_id: Uuid,
        filter: &JobFilter,
    ) -> StoreResult<Vec<JobWithTechnician>>;

    /// Every job of a company, for dashboard aggregation
    async fn list_company_jobs(&self, company_id: Uuid) -> StoreResult<Vec<Job>>;

    async fn update_job(
        &self,
        company_id: Uuid,
        id: Uuid,
        data: UpdateJob,
    ) -> StoreResult<Option<Job>>;

    async fn delete_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<bool>;

    /// Assigns a job and marks the technician busy
    ///
    /// Both writes commit together or not at all. Completed and cancelled
    /// jobs are refused.
    async fn dispatch_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        technician_id: Uuid,
    ) -> StoreResult<JobTransition>;

    /// Completes a job and frees its technician
    ///
    /// Both writes commit together or not at all. Cancelled jobs are refused.
    async fn complete_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        amount: Option<f64>,
    ) -> StoreResult<JobTransition>;
}
