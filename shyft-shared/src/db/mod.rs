/// Database layer for Shyft
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool
/// - `migrations`: Embedded schema migrations
/// - `store`: The `Store` trait handlers program against
/// - `postgres`: `Store` over PostgreSQL
/// - `memory`: `Store` in process memory, used by tests
///
/// # Example
///
/// ```no_run
/// use shyft_shared::db::{pool::{create_pool, DatabaseConfig}, postgres::PgStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     let store = PgStore::new(pool);
///     Ok(())
/// }
/// ```

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;
