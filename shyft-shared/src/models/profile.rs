/// Profile model and database operations
///
/// A profile links an identity from the hosted auth service (`user_id`) to a
/// company and a role. A user without a profile is a first-time user who has
/// not finished onboarding yet.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE,
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     full_name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     role profile_role NOT NULL DEFAULT 'technician',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role of a profile within its company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    /// Owns billing and company settings
    Admin,

    /// Dispatches and manages jobs
    Manager,

    /// Field worker
    Technician,
}

impl ProfileRole {
    /// Converts role to string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRole::Admin => "admin",
            ProfileRole::Manager => "manager",
            ProfileRole::Technician => "technician",
        }
    }
}

/// Profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Identity in the hosted auth service
    pub user_id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Full name shown in the dashboard
    pub full_name: String,

    /// Contact email
    pub email: Option<String>,

    /// Role within the company
    pub role: ProfileRole,

    /// When the profile was created
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    /// Identity in the hosted auth service
    pub user_id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Full name
    pub full_name: String,

    /// Contact email
    pub email: Option<String>,

    /// Role
    pub role: ProfileRole,
}

const PROFILE_COLUMNS: &str =
    "id, user_id, company_id, full_name, email, role, created_at, updated_at";

impl Profile {
    /// Creates a new profile
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the user already has a profile.
    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (user_id, company_id, full_name, email, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(data.user_id)
        .bind(data.company_id)
        .bind(data.full_name)
        .bind(data.email)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    /// Finds the profile of an auth-service user
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a profile by ID within a company
    pub async fn find_by_id_and_company(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1 AND company_id = $2",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(ProfileRole::Admin.as_str(), "admin");
        assert_eq!(ProfileRole::Manager.as_str(), "manager");
        assert_eq!(ProfileRole::Technician.as_str(), "technician");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ProfileRole::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
    }
}
