/// Middleware modules for the API server
///
/// - `auth`: Bearer-token validation against the auth service
/// - `security`: Security response headers

pub mod auth;
pub mod security;
