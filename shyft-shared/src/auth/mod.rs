/// Authentication against the hosted auth service
///
/// Shyft keeps no credentials of its own. Every bearer token is checked with
/// the auth service on every request.
///
/// # Modules
///
/// - [`provider`]: `AuthProvider` trait, session/user types and errors
/// - [`gotrue`]: `AuthProvider` over the hosted GoTrue REST API
/// - [`mock`]: `AuthProvider` in process memory for tests
/// - [`context`]: Per-request `AuthContext` and bearer-header parsing

pub mod context;
pub mod gotrue;
pub mod mock;
pub mod provider;
