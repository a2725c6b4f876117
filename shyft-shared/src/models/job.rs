/// Job model and database operations
///
/// Jobs are the unit of field work: a customer visit that gets scheduled,
/// dispatched to a technician and completed with a billed amount.
///
/// # State Machine
///
/// ```text
/// pending → assigned → in_progress → completed
/// pending | assigned | in_progress → cancelled
/// ```
///
/// Dispatch and completion drive the happy path. `PATCH /jobs/:id` may set
/// any status directly; transitions there are not guarded.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE jobs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     customer_name VARCHAR(255) NOT NULL,
///     customer_email VARCHAR(255),
///     customer_phone VARCHAR(50),
///     customer_address TEXT,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status job_status NOT NULL DEFAULT 'pending',
///     priority job_priority NOT NULL DEFAULT 'normal',
///     assigned_to UUID REFERENCES technicians(id) ON DELETE SET NULL,
///     scheduled_at TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     amount DOUBLE PRECISION,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::technician::TechnicianStatus;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, nobody assigned yet
    Pending,

    /// Dispatched to a technician
    Assigned,

    /// Technician on site
    InProgress,

    /// Work done and billed
    Completed,

    /// Called off
    Cancelled,
}

impl JobStatus {
    /// Converts status to string
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Assigned => "assigned",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Checks if the job has finished one way or another
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Checks if a technician is currently working the job
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::InProgress)
    }
}

/// Job priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl JobPriority {
    /// Converts priority to string
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Low => "low",
            JobPriority::Normal => "normal",
            JobPriority::High => "high",
            JobPriority::Urgent => "urgent",
        }
    }
}

/// Job row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    /// Unique job ID
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Customer name
    pub customer_name: String,

    /// Customer email
    pub customer_email: Option<String>,

    /// Customer phone
    pub customer_phone: Option<String>,

    /// Service address
    pub customer_address: Option<String>,

    /// Short summary (e.g. "Replace water heater")
    pub title: String,

    /// Longer notes
    pub description: Option<String>,

    /// Current status
    pub status: JobStatus,

    /// Priority
    pub priority: JobPriority,

    /// Assigned technician
    pub assigned_to: Option<Uuid>,

    /// Scheduled visit time
    pub scheduled_at: Option<DateTime<Utc>>,

    /// When the job was completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Billed amount in currency units
    pub amount: Option<f64>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

/// Summary of the technician a job is assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTechnician {
    pub id: Uuid,
    pub full_name: String,
    pub status: TechnicianStatus,
}

/// Job joined with its assigned technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobWithTechnician {
    #[serde(flatten)]
    pub job: Job,

    /// Assigned technician, if any
    pub technician: Option<AssignedTechnician>,
}

/// Flat row produced by the job/technician/profile join
#[derive(Debug, sqlx::FromRow)]
struct JobJoinRow {
    #[sqlx(flatten)]
    job: Job,
    technician_name: Option<String>,
    technician_status: Option<TechnicianStatus>,
}

impl From<JobJoinRow> for JobWithTechnician {
    fn from(row: JobJoinRow) -> Self {
        let technician = match (row.job.assigned_to, row.technician_name, row.technician_status) {
            (Some(id), Some(full_name), Some(status)) => Some(AssignedTechnician {
                id,
                full_name,
                status,
            }),
            _ => None,
        };

        JobWithTechnician {
            job: row.job,
            technician,
        }
    }
}

/// Input for creating a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub company_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: JobPriority,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
}

/// Input for a partial job update
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateJob {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
    pub priority: Option<JobPriority>,
    pub assigned_to: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
}

impl UpdateJob {
    /// Whether the update sets nothing
    pub fn is_empty(&self) -> bool {
        *self == UpdateJob::default()
    }

    /// Applies this update to an in-memory job row
    pub fn apply(self, job: &mut Job) {
        if let Some(v) = self.customer_name {
            job.customer_name = v;
        }
        if let Some(v) = self.customer_email {
            job.customer_email = Some(v);
        }
        if let Some(v) = self.customer_phone {
            job.customer_phone = Some(v);
        }
        if let Some(v) = self.customer_address {
            job.customer_address = Some(v);
        }
        if let Some(v) = self.title {
            job.title = v;
        }
        if let Some(v) = self.description {
            job.description = Some(v);
        }
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = self.priority {
            job.priority = v;
        }
        if let Some(v) = self.assigned_to {
            job.assigned_to = Some(v);
        }
        if let Some(v) = self.scheduled_at {
            job.scheduled_at = Some(v);
        }
        if let Some(v) = self.amount {
            job.amount = Some(v);
        }
        job.updated_at = Utc::now();
    }
}

/// Filters for listing jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub priority: Option<JobPriority>,
    pub assigned_to: Option<Uuid>,
}

impl JobFilter {
    /// Checks whether a job passes this filter
    pub fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && self.priority.map_or(true, |p| job.priority == p)
            && self.assigned_to.map_or(true, |t| job.assigned_to == Some(t))
    }
}

const JOB_COLUMNS: &str = "j.id, j.company_id, j.customer_name, j.customer_email, \
     j.customer_phone, j.customer_address, j.title, j.description, j.status, j.priority, \
     j.assigned_to, j.scheduled_at, j.completed_at, j.amount, j.created_at, j.updated_at";

const JOB_JOIN: &str = "FROM jobs j \
     LEFT JOIN technicians t ON t.id = j.assigned_to \
     LEFT JOIN profiles p ON p.id = t.profile_id";

impl Job {
    /// Creates a job in `pending` status
    pub async fn create(pool: &PgPool, data: CreateJob) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs AS j (company_id, customer_name, customer_email, customer_phone,
                                   customer_address, title, description, priority,
                                   scheduled_at, amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(data.company_id)
        .bind(data.customer_name)
        .bind(data.customer_email)
        .bind(data.customer_phone)
        .bind(data.customer_address)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.scheduled_at)
        .bind(data.amount)
        .fetch_one(pool)
        .await
    }

    /// Finds a job by ID within a company
    pub async fn find_by_id_and_company<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs j WHERE j.id = $1 AND j.company_id = $2",
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a job joined with its technician
    pub async fn find_with_technician(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<JobWithTechnician>, sqlx::Error> {
        let row = sqlx::query_as::<_, JobJoinRow>(&format!(
            r#"
            SELECT {}, p.full_name AS technician_name, t.status AS technician_status
            {}
            WHERE j.id = $1 AND j.company_id = $2
            "#,
            JOB_COLUMNS, JOB_JOIN
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Lists a company's jobs, newest first, joined with technicians
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
        filter: &JobFilter,
    ) -> Result<Vec<JobWithTechnician>, sqlx::Error> {
        let rows = sqlx::query_as::<_, JobJoinRow>(&format!(
            r#"
            SELECT {}, p.full_name AS technician_name, t.status AS technician_status
            {}
            WHERE j.company_id = $1
              AND ($2::job_status IS NULL OR j.status = $2)
              AND ($3::job_priority IS NULL OR j.priority = $3)
              AND ($4::uuid IS NULL OR j.assigned_to = $4)
            ORDER BY j.created_at DESC
            "#,
            JOB_COLUMNS, JOB_JOIN
        ))
        .bind(company_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.assigned_to)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lists every job of a company without the technician join
    ///
    /// Used by the dashboard aggregations.
    pub async fn list_all_by_company(
        pool: &PgPool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs j WHERE j.company_id = $1 ORDER BY j.created_at DESC",
            JOB_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated job if found, None if it doesn't exist in the company
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
        data: UpdateJob,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE jobs AS j SET updated_at = NOW()");
        let mut bind_count = 2;

        let mut push = |column: &str, query: &mut String| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.customer_name.is_some() {
            push("customer_name", &mut query);
        }
        if data.customer_email.is_some() {
            push("customer_email", &mut query);
        }
        if data.customer_phone.is_some() {
            push("customer_phone", &mut query);
        }
        if data.customer_address.is_some() {
            push("customer_address", &mut query);
        }
        if data.title.is_some() {
            push("title", &mut query);
        }
        if data.description.is_some() {
            push("description", &mut query);
        }
        if data.status.is_some() {
            push("status", &mut query);
        }
        if data.priority.is_some() {
            push("priority", &mut query);
        }
        if data.assigned_to.is_some() {
            push("assigned_to", &mut query);
        }
        if data.scheduled_at.is_some() {
            push("scheduled_at", &mut query);
        }
        if data.amount.is_some() {
            push("amount", &mut query);
        }

        query.push_str(&format!(
            " WHERE j.id = $1 AND j.company_id = $2 RETURNING {}",
            JOB_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Job>(&query).bind(id).bind(company_id);

        if let Some(v) = data.customer_name {
            q = q.bind(v);
        }
        if let Some(v) = data.customer_email {
            q = q.bind(v);
        }
        if let Some(v) = data.customer_phone {
            q = q.bind(v);
        }
        if let Some(v) = data.customer_address {
            q = q.bind(v);
        }
        if let Some(v) = data.title {
            q = q.bind(v);
        }
        if let Some(v) = data.description {
            q = q.bind(v);
        }
        if let Some(v) = data.status {
            q = q.bind(v);
        }
        if let Some(v) = data.priority {
            q = q.bind(v);
        }
        if let Some(v) = data.assigned_to {
            q = q.bind(v);
        }
        if let Some(v) = data.scheduled_at {
            q = q.bind(v);
        }
        if let Some(v) = data.amount {
            q = q.bind(v);
        }

        q.fetch_optional(pool).await
    }

    /// Assigns a job to a technician and moves it to `assigned`
    ///
    /// Completed and cancelled jobs are left untouched and yield `None`.
    pub async fn assign<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
        technician_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs AS j
            SET assigned_to = $3, status = 'assigned', updated_at = NOW()
            WHERE j.id = $1 AND j.company_id = $2
              AND j.status NOT IN ('completed', 'cancelled')
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(technician_id)
        .fetch_optional(executor)
        .await
    }

    /// Marks a job completed, stamping `completed_at`
    ///
    /// `amount` overwrites the stored amount only when given. Cancelled jobs
    /// are left untouched and yield `None`.
    pub async fn complete<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
        amount: Option<f64>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs AS j
            SET status = 'completed',
                completed_at = NOW(),
                amount = COALESCE($3, amount),
                updated_at = NOW()
            WHERE j.id = $1 AND j.company_id = $2 AND j.status <> 'cancelled'
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(amount)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a job
    ///
    /// # Returns
    ///
    /// True if a job was deleted
    pub async fn delete(pool: &PgPool, id: Uuid, company_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
