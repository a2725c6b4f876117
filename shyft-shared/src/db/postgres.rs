/// PostgreSQL-backed [`Store`]
///
/// Thin delegation to the model queries. Dispatch and completion are the only
/// operations that span two tables; they run in a single transaction so a
/// failing technician update rolls the job update back.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::{JobTransition, Store, StoreResult};
use crate::models::{
    company::{Company, CreateCompany, UpdateCompany},
    job::{CreateJob, Job, JobFilter, JobWithTechnician, UpdateJob},
    profile::{CreateProfile, Profile},
    technician::{CreateTechnician, Location, Technician, TechnicianStatus, TechnicianWithProfile},
};

/// Store over a sqlx connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Explains why a guarded job update matched no row
    async fn rejected(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<JobTransition> {
        Ok(
            match Job::find_by_id_and_company(&mut **tx, job_id, company_id).await? {
                Some(current) => JobTransition::Refused(current.status),
                None => JobTransition::JobNotFound,
            },
        )
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        super::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_company(&self, data: CreateCompany) -> StoreResult<Company> {
        Ok(Company::create(&self.pool, data).await?)
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(Company::find_by_id(&self.pool, id).await?)
    }

    async fn find_company_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> StoreResult<Option<Company>> {
        Ok(Company::find_by_stripe_customer(&self.pool, customer_id).await?)
    }

    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>> {
        Ok(Company::update(&self.pool, id, data).await?)
    }

    async fn create_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        Ok(Profile::create(&self.pool, data).await?)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(Profile::find_by_user_id(&self.pool, user_id).await?)
    }

    async fn find_profile(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(Profile::find_by_id_and_company(&self.pool, id, company_id).await?)
    }

    async fn create_technician(&self, data: CreateTechnician) -> StoreResult<Technician> {
        Ok(Technician::create(&self.pool, data).await?)
    }

    async fn find_technician(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Technician>> {
        Ok(Technician::find_by_id_and_company(&self.pool, id, company_id).await?)
    }

    async fn list_technicians(
        &self,
        company_id: Uuid,
        status: Option<TechnicianStatus>,
    ) -> StoreResult<Vec<TechnicianWithProfile>> {
        Ok(Technician::list_by_company(&self.pool, company_id, status).await?)
    }

    async fn set_technician_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: TechnicianStatus,
    ) -> StoreResult<Option<Technician>> {
        Ok(Technician::set_status(&self.pool, id, company_id, status).await?)
    }

    async fn set_technician_location(
        &self,
        company_id: Uuid,
        id: Uuid,
        location: Location,
    ) -> StoreResult<Option<Technician>> {
        Ok(Technician::set_location(&self.pool, id, company_id, location).await?)
    }

    async fn create_job(&self, data: CreateJob) -> StoreResult<Job> {
        Ok(Job::create(&self.pool, data).await?)
    }

    async fn find_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<JobWithTechnician>> {
        Ok(Job::find_with_technician(&self.pool, id, company_id).await?)
    }

    async fn list_jobs(
        &self,
        company_id: Uuid,
        filter: &JobFilter,
    ) -> StoreResult<Vec<JobWithTechnician>> {
        Ok(Job::list_by_company(&self.pool, company_id, filter).await?)
    }

    async fn list_company_jobs(&self, company_id: Uuid) -> StoreResult<Vec<Job>> {
        Ok(Job::list_all_by_company(&self.pool, company_id).await?)
    }

    async fn update_job(
        &self,
        company_id: Uuid,
        id: Uuid,
        data: UpdateJob,
    ) -> StoreResult<Option<Job>> {
        if data.is_empty() {
            return Ok(Job::find_by_id_and_company(&self.pool, id, company_id).await?);
        }
        Ok(Job::update(&self.pool, id, company_id, data).await?)
    }

    async fn delete_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Job::delete(&self.pool, id, company_id).await?)
    }

    async fn dispatch_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        technician_id: Uuid,
    ) -> StoreResult<JobTransition> {
        let mut tx = self.pool.begin().await?;

        let Some(job) = Job::assign(&mut *tx, job_id, company_id, technician_id).await? else {
            return Self::rejected(&mut tx, company_id, job_id).await;
        };

        if Technician::set_status(&mut *tx, technician_id, company_id, TechnicianStatus::Busy)
            .await?
            .is_none()
        {
            warn!(%job_id, %technician_id, "Technician not found during dispatch, rolling back");
            return Ok(JobTransition::TechnicianNotFound);
        }

        tx.commit().await?;
        debug!(%job_id, %technician_id, "Job dispatched");
        Ok(JobTransition::Applied(job))
    }

    async fn complete_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        amount: Option<f64>,
    ) -> StoreResult<JobTransition> {
        let mut tx = self.pool.begin().await?;

        let Some(job) = Job::complete(&mut *tx, job_id, company_id, amount).await? else {
            return Self::rejected(&mut tx, company_id, job_id).await;
        };

        if let Some(technician_id) = job.assigned_to {
            Technician::set_status(
                &mut *tx,
                technician_id,
                company_id,
                TechnicianStatus::Available,
            )
            .await?;
        }

        tx.commit().await?;
        debug!(%job_id, "Job completed");
        Ok(JobTransition::Applied(job))
    }
}
