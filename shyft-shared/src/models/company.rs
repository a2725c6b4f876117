/// Company model and database operations
///
/// A company is the tenant boundary in Shyft. Every profile, technician and
/// job belongs to exactly one company, and the company carries the billing
/// subscription.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     subscription_tier subscription_tier NOT NULL DEFAULT 'free',
///     subscription_status VARCHAR(50),
///     stripe_customer_id VARCHAR(255) UNIQUE,
///     stripe_subscription_id VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use shyft_shared::models::company::{Company, CreateCompany, SubscriptionTier, UpdateCompany};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let company = Company::create(&pool, CreateCompany {
///     name: "Acme Plumbing".to_string(),
/// }).await?;
///
/// Company::update(&pool, company.id, UpdateCompany {
///     subscription_tier: Some(SubscriptionTier::Professional),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Subscription plan level
///
/// Every company starts on `Free` and moves to a paid tier once a checkout
/// completes. Cancelled subscriptions fall back to `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// No paid subscription
    #[default]
    Free,

    /// Small crews
    Starter,

    /// Growing teams
    Professional,

    /// Large operations
    Enterprise,
}

impl SubscriptionTier {
    /// Converts tier to its database/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Display name used on pricing pages
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Starter => "Starter",
            SubscriptionTier::Professional => "Professional",
            SubscriptionTier::Enterprise => "Enterprise",
        }
    }
}

/// Company row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    /// Unique company ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Current subscription tier
    pub subscription_tier: SubscriptionTier,

    /// Last known payments-provider subscription status (`active`, `past_due`, ...)
    pub subscription_status: Option<String>,

    /// Payments-provider customer ID
    pub stripe_customer_id: Option<String>,

    /// Payments-provider subscription ID
    pub stripe_subscription_id: Option<String>,

    /// When the company was created
    pub created_at: DateTime<Utc>,

    /// When the company was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    /// Display name
    pub name: String,
}

/// Input for updating a company
///
/// `None` leaves a column untouched. The nested options on the Stripe ids
/// allow clearing them: `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCompany {
    /// New name
    pub name: Option<String>,

    /// New tier
    pub subscription_tier: Option<SubscriptionTier>,

    /// New subscription status
    pub subscription_status: Option<String>,

    /// New payments customer ID
    pub stripe_customer_id: Option<Option<String>>,

    /// New payments subscription ID
    pub stripe_subscription_id: Option<Option<String>>,
}

impl UpdateCompany {
    /// Applies this update to an in-memory company row
    pub fn apply(self, company: &mut Company) {
        if let Some(name) = self.name {
            company.name = name;
        }
        if let Some(tier) = self.subscription_tier {
            company.subscription_tier = tier;
        }
        if let Some(status) = self.subscription_status {
            company.subscription_status = Some(status);
        }
        if let Some(customer_id) = self.stripe_customer_id {
            company.stripe_customer_id = customer_id;
        }
        if let Some(subscription_id) = self.stripe_subscription_id {
            company.stripe_subscription_id = subscription_id;
        }
        company.updated_at = Utc::now();
    }
}

const COMPANY_COLUMNS: &str = "id, name, subscription_tier, subscription_status, \
     stripe_customer_id, stripe_subscription_id, created_at, updated_at";

impl Company {
    /// Creates a new company on the free tier
    pub async fn create(pool: &PgPool, data: CreateCompany) -> Result<Self, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (name) VALUES ($1) RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(company)
    }

    /// Finds a company by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE id = $1",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    /// Finds a company by its payments-provider customer ID
    ///
    /// Subscription webhooks only carry the customer ID, so this is how they
    /// are routed back to a company.
    pub async fn find_by_stripe_customer(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE stripe_customer_id = $1",
            COMPANY_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    /// Updates an existing company
    ///
    /// Only fields set in `data` are written.
    ///
    /// # Returns
    ///
    /// The updated company if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE companies SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.subscription_tier.is_some() {
            bind_count += 1;
            query.push_str(&format!(", subscription_tier = ${}", bind_count));
        }
        if data.subscription_status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", subscription_status = ${}", bind_count));
        }
        if data.stripe_customer_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", stripe_customer_id = ${}", bind_count));
        }
        if data.stripe_subscription_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", stripe_subscription_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", COMPANY_COLUMNS));

        let mut q = sqlx::query_as::<_, Company>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(tier) = data.subscription_tier {
            q = q.bind(tier);
        }
        if let Some(status) = data.subscription_status {
            q = q.bind(status);
        }
        if let Some(customer_id) = data.stripe_customer_id {
            q = q.bind(customer_id);
        }
        if let Some(subscription_id) = data.stripe_subscription_id {
            q = q.bind(subscription_id);
        }

        q.fetch_optional(pool).await
    }
}
