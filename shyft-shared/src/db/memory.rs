/// In-memory [`Store`]
///
/// Keeps every table in a `HashMap` behind one `RwLock`. Behaves like the
/// PostgreSQL backend for everything the handlers rely on: company scoping,
/// newest-first job ordering, the technician join and the two-table writes
/// of dispatch/complete (which are atomic here because the lock is held for
/// the whole operation).
///
/// # Example
///
/// ```
/// use shyft_shared::db::{memory::MemoryStore, store::Store};
/// use shyft_shared::models::company::CreateCompany;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let company = store.create_company(CreateCompany { name: "Acme".into() }).await?;
/// assert!(store.find_company(company.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{JobTransition, Store, StoreError, StoreResult};
use crate::models::{
    company::{Company, CreateCompany, SubscriptionTier, UpdateCompany},
    job::{AssignedTechnician, CreateJob, Job, JobFilter, JobStatus, JobWithTechnician, UpdateJob},
    profile::{CreateProfile, Profile},
    technician::{CreateTechnician, Location, Technician, TechnicianStatus, TechnicianWithProfile},
};

#[derive(Default)]
struct Tables {
    companies: HashMap<Uuid, Company>,
    profiles: HashMap<Uuid, Profile>,
    technicians: HashMap<Uuid, Technician>,
    jobs: HashMap<Uuid, Job>,
}

impl Tables {
    fn join_job(&self, job: &Job) -> JobWithTechnician {
        let technician = job.assigned_to.and_then(|tech_id| {
            let tech = self.technicians.get(&tech_id)?;
            let profile = self.profiles.get(&tech.profile_id)?;
            Some(AssignedTechnician {
                id: tech.id,
                full_name: profile.full_name.clone(),
                status: tech.status,
            })
        });

        JobWithTechnician {
            job: job.clone(),
            technician,
        }
    }

    fn company_technician_mut(&mut self, company_id: Uuid, id: Uuid) -> Option<&mut Technician> {
        self.technicians
            .get_mut(&id)
            .filter(|t| t.company_id == company_id)
    }

    fn company_job_mut(&mut self, company_id: Uuid, id: Uuid) -> Option<&mut Job> {
        self.jobs.get_mut(&id).filter(|j| j.company_id == company_id)
    }
}

/// Store that lives in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_company(&self, data: CreateCompany) -> StoreResult<Company> {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: data.name,
            subscription_tier: SubscriptionTier::Free,
            subscription_status: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: now,
            updated_at: now,
        };

        self.tables
            .write()
            .await
            .companies
            .insert(company.id, company.clone());
        Ok(company)
    }

    async fn find_company(&self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn find_company_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> StoreResult<Option<Company>> {
        Ok(self
            .tables
            .read()
            .await
            .companies
            .values()
            .find(|c| c.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>> {
        let mut tables = self.tables.write().await;

        if let Some(Some(customer_id)) = &data.stripe_customer_id {
            let taken = tables
                .companies
                .values()
                .any(|c| c.id != id && c.stripe_customer_id.as_deref() == Some(customer_id));
            if taken {
                return Err(StoreError::Conflict(
                    "companies_stripe_customer_id_key".to_string(),
                ));
            }
        }

        Ok(tables.companies.get_mut(&id).map(|company| {
            data.apply(company);
            company.clone()
        }))
    }

    async fn create_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;

        if tables.profiles.values().any(|p| p.user_id == data.user_id) {
            return Err(StoreError::Conflict("profiles_user_id_key".to_string()));
        }
        if !tables.companies.contains_key(&data.company_id) {
            return Err(StoreError::Conflict("profiles_company_id_fkey".to_string()));
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            company_id: data.company_id,
            full_name: data.full_name,
            email: data.email,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn find_profile(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .cloned())
    }

    async fn create_technician(&self, data: CreateTechnician) -> StoreResult<Technician> {
        let mut tables = self.tables.write().await;

        if tables
            .technicians
            .values()
            .any(|t| t.profile_id == data.profile_id)
        {
            return Err(StoreError::Conflict(
                "technicians_profile_id_key".to_string(),
            ));
        }

        let now = Utc::now();
        let technician = Technician {
            id: Uuid::new_v4(),
            profile_id: data.profile_id,
            company_id: data.company_id,
            skills: data.skills,
            status: TechnicianStatus::Available,
            current_location: None,
            created_at: now,
            updated_at: now,
        };
        tables.technicians.insert(technician.id, technician.clone());
        Ok(technician)
    }

    async fn find_technician(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<Technician>> {
        Ok(self
            .tables
            .read()
            .await
            .technicians
            .get(&id)
            .filter(|t| t.company_id == company_id)
            .cloned())
    }

    async fn list_technicians(
        &self,
        company_id: Uuid,
        status: Option<TechnicianStatus>,
    ) -> StoreResult<Vec<TechnicianWithProfile>> {
        let tables = self.tables.read().await;

        let mut technicians: Vec<TechnicianWithProfile> = tables
            .technicians
            .values()
            .filter(|t| t.company_id == company_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .filter_map(|t| {
                let profile = tables.profiles.get(&t.profile_id)?;
                Some(TechnicianWithProfile {
                    technician: t.clone(),
                    full_name: profile.full_name.clone(),
                    email: profile.email.clone(),
                })
            })
            .collect();

        technicians.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(technicians)
    }

    async fn set_technician_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        status: TechnicianStatus,
    ) -> StoreResult<Option<Technician>> {
        let mut tables = self.tables.write().await;
        Ok(tables.company_technician_mut(company_id, id).map(|t| {
            t.status = status;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn set_technician_location(
        &self,
        company_id: Uuid,
        id: Uuid,
        location: Location,
    ) -> StoreResult<Option<Technician>> {
        let mut tables = self.tables.write().await;
        Ok(tables.company_technician_mut(company_id, id).map(|t| {
            t.current_location = Some(Json(location));
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn create_job(&self, data: CreateJob) -> StoreResult<Job> {
        let mut tables = self.tables.write().await;

        if !tables.companies.contains_key(&data.company_id) {
            return Err(StoreError::Conflict("jobs_company_id_fkey".to_string()));
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            company_id: data.company_id,
            customer_name: data.customer_name,
            customer_email: data.customer_email,
            customer_phone: data.customer_phone,
            customer_address: data.customer_address,
            title: data.title,
            description: data.description,
            status: JobStatus::Pending,
            priority: data.priority,
            assigned_to: None,
            scheduled_at: data.scheduled_at,
            completed_at: None,
            amount: data.amount,
            created_at: now,
            updated_at: now,
        };
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<Option<JobWithTechnician>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .get(&id)
            .filter(|j| j.company_id == company_id)
            .map(|j| tables.join_job(j)))
    }

    async fn list_jobs(
        &self,
        company_id: Uuid,
        filter: &JobFilter,
    ) -> StoreResult<Vec<JobWithTechnician>> {
        let tables = self.tables.read().await;

        let mut jobs: Vec<&Job> = tables
            .jobs
            .values()
            .filter(|j| j.company_id == company_id && filter.matches(j))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(jobs.into_iter().map(|j| tables.join_job(j)).collect())
    }

    async fn list_company_jobs(&self, company_id: Uuid) -> StoreResult<Vec<Job>> {
        let tables = self.tables.read().await;

        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.company_id == company_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job(
        &self,
        company_id: Uuid,
        id: Uuid,
        data: UpdateJob,
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables.company_job_mut(company_id, id).map(|job| {
            data.apply(job);
            job.clone()
        }))
    }

    async fn delete_job(&self, company_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.company_job_mut(company_id, id).is_none() {
            return Ok(false);
        }
        Ok(tables.jobs.remove(&id).is_some())
    }

    async fn dispatch_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        technician_id: Uuid,
    ) -> StoreResult<JobTransition> {
        let mut tables = self.tables.write().await;

        match tables.company_job_mut(company_id, job_id) {
            None => return Ok(JobTransition::JobNotFound),
            Some(job) if job.status.is_terminal() => {
                return Ok(JobTransition::Refused(job.status))
            }
            Some(_) => {}
        }

        let now = Utc::now();
        let Some(tech) = tables.company_technician_mut(company_id, technician_id) else {
            return Ok(JobTransition::TechnicianNotFound);
        };
        tech.status = TechnicianStatus::Busy;
        tech.updated_at = now;

        Ok(match tables.company_job_mut(company_id, job_id) {
            Some(job) => {
                job.assigned_to = Some(technician_id);
                job.status = JobStatus::Assigned;
                job.updated_at = now;
                JobTransition::Applied(job.clone())
            }
            None => JobTransition::JobNotFound,
        })
    }

    async fn complete_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        amount: Option<f64>,
    ) -> StoreResult<JobTransition> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let job = match tables.company_job_mut(company_id, job_id) {
            None => return Ok(JobTransition::JobNotFound),
            Some(job) if job.status == JobStatus::Cancelled => {
                return Ok(JobTransition::Refused(job.status))
            }
            Some(job) => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(now);
                if amount.is_some() {
                    job.amount = amount;
                }
                job.updated_at = now;
                job.clone()
            }
        };

        if let Some(tech_id) = job.assigned_to {
            if let Some(tech) = tables.company_technician_mut(company_id, tech_id) {
                tech.status = TechnicianStatus::Available;
                tech.updated_at = now;
            }
        }

        Ok(JobTransition::Applied(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{job::JobPriority, profile::ProfileRole};

    async fn seed(store: &MemoryStore) -> (Company, Technician) {
        let company = store
            .create_company(CreateCompany {
                name: "Acme".to_string(),
            })
            .await
            .unwrap();
        let profile = store
            .create_profile(CreateProfile {
                user_id: Uuid::new_v4(),
                company_id: company.id,
                full_name: "Dana Reyes".to_string(),
                email: None,
                role: ProfileRole::Technician,
            })
            .await
            .unwrap();
        let tech = store
            .create_technician(CreateTechnician {
                profile_id: profile.id,
                company_id: company.id,
                skills: vec!["plumbing".to_string()],
            })
            .await
            .unwrap();
        (company, tech)
    }

    fn new_job(company_id: Uuid, title: &str) -> CreateJob {
        CreateJob {
            company_id,
            customer_name: "Pat Doe".to_string(),
            customer_email: None,
            customer_phone: None,
            customer_address: None,
            title: title.to_string(),
            description: None,
            priority: JobPriority::Normal,
            scheduled_at: None,
            amount: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_and_complete_flip_technician_status() {
        let store = MemoryStore::new();
        let (company, tech) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        let JobTransition::Applied(dispatched) = store
            .dispatch_job(company.id, job.id, tech.id)
            .await
            .unwrap()
        else {
            panic!("dispatch was not applied");
        };
        assert_eq!(dispatched.status, JobStatus::Assigned);
        assert_eq!(dispatched.assigned_to, Some(tech.id));
        let busy = store.find_technician(company.id, tech.id).await.unwrap().unwrap();
        assert_eq!(busy.status, TechnicianStatus::Busy);

        let JobTransition::Applied(completed) = store
            .complete_job(company.id, job.id, Some(180.0))
            .await
            .unwrap()
        else {
            panic!("completion was not applied");
        };
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.amount, Some(180.0));
        let free = store.find_technician(company.id, tech.id).await.unwrap().unwrap();
        assert_eq!(free.status, TechnicianStatus::Available);
    }

    #[tokio::test]
    async fn test_dispatch_with_unknown_technician_changes_nothing() {
        let store = MemoryStore::new();
        let (company, _) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();

        let result = store
            .dispatch_job(company.id, job.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(result, JobTransition::TechnicianNotFound);

        let stored = store.find_job(company.id, job.id).await.unwrap().unwrap();
        assert_eq!(stored.job.status, JobStatus::Pending);
        assert!(stored.job.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_refuses_closed_jobs() {
        let store = MemoryStore::new();
        let (company, tech) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();
        store
            .update_job(
                company.id,
                job.id,
                UpdateJob {
                    status: Some(JobStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = store.dispatch_job(company.id, job.id, tech.id).await.unwrap();
        assert_eq!(result, JobTransition::Refused(JobStatus::Cancelled));

        let untouched = store.find_technician(company.id, tech.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, TechnicianStatus::Available);
        let stored = store.find_job(company.id, job.id).await.unwrap().unwrap();
        assert!(stored.job.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_complete_refuses_cancelled_job() {
        let store = MemoryStore::new();
        let (company, _) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();
        store
            .update_job(
                company.id,
                job.id,
                UpdateJob {
                    status: Some(JobStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = store.complete_job(company.id, job.id, Some(90.0)).await.unwrap();
        assert_eq!(result, JobTransition::Refused(JobStatus::Cancelled));

        let stored = store.find_job(company.id, job.id).await.unwrap().unwrap();
        assert!(stored.job.completed_at.is_none());
        assert_eq!(stored.job.amount, None);
    }

    #[tokio::test]
    async fn test_transitions_on_missing_job() {
        let store = MemoryStore::new();
        let (company, tech) = seed(&store).await;

        let dispatched = store
            .dispatch_job(company.id, Uuid::new_v4(), tech.id)
            .await
            .unwrap();
        assert_eq!(dispatched, JobTransition::JobNotFound);
        let completed = store.complete_job(company.id, Uuid::new_v4(), None).await.unwrap();
        assert_eq!(completed, JobTransition::JobNotFound);
    }

    #[tokio::test]
    async fn test_jobs_are_scoped_to_company() {
        let store = MemoryStore::new();
        let (company, _) = seed(&store).await;
        let (other, _) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();

        assert!(store.find_job(other.id, job.id).await.unwrap().is_none());
        assert!(!store.delete_job(other.id, job.id).await.unwrap());
        assert!(store.list_jobs(other.id, &JobFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_jobs_joins_technician_name() {
        let store = MemoryStore::new();
        let (company, tech) = seed(&store).await;
        let job = store.create_job(new_job(company.id, "Leak")).await.unwrap();
        store.dispatch_job(company.id, job.id, tech.id).await.unwrap();

        let jobs = store.list_jobs(company.id, &JobFilter::default()).await.unwrap();
        let technician = jobs[0].technician.as_ref().unwrap();
        assert_eq!(technician.full_name, "Dana Reyes");
        assert_eq!(technician.status, TechnicianStatus::Busy);
    }

    #[tokio::test]
    async fn test_duplicate_profile_is_conflict() {
        let store = MemoryStore::new();
        let company = store
            .create_company(CreateCompany {
                name: "Acme".to_string(),
            })
            .await
            .unwrap();
        let user_id = Uuid::new_v4();
        let profile = CreateProfile {
            user_id,
            company_id: company.id,
            full_name: "Sam".to_string(),
            email: None,
            role: ProfileRole::Admin,
        };

        store.create_profile(profile.clone()).await.unwrap();
        let err = store.create_profile(profile).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_company_by_stripe_customer() {
        let store = MemoryStore::new();
        let (company, _) = seed(&store).await;
        store
            .update_company(
                company.id,
                UpdateCompany {
                    stripe_customer_id: Some(Some("cus_42".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let found = store
            .find_company_by_stripe_customer("cus_42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, company.id);
        assert!(store
            .find_company_by_stripe_customer("cus_missing")
            .await
            .unwrap()
            .is_none());
    }
}
