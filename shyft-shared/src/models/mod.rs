/// Database models for Shyft
///
/// This module contains the relational rows the API reads and writes, along
/// with their PostgreSQL queries.
///
/// # Models
///
/// - `company`: Tenants and their subscription tier
/// - `profile`: Auth-service users linked to a company and role
/// - `technician`: Field workers jobs are dispatched to
/// - `job`: Customer work orders
///
/// # Example
///
/// ```no_run
/// use shyft_shared::models::company::{Company, CreateCompany};
/// use shyft_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let company = Company::create(&pool, CreateCompany {
///     name: "Acme Plumbing".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod company;
pub mod job;
pub mod profile;
pub mod technician;
