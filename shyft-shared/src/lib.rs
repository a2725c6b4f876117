//! # Shyft Shared Library
//!
//! Domain types, persistence and external-service clients used by the Shyft
//! API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `db`: Connection pool, migrations and the `Store` seam (Postgres and in-memory)
//! - `auth`: Hosted auth-service client and per-request auth context
//! - `billing`: Stripe client, plan catalog, webhook verification and reconciliation
//! - `stats`: Dashboard aggregation

pub mod auth;
pub mod billing;
pub mod db;
pub mod models;
pub mod stats;

/// Current version of the Shyft shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
