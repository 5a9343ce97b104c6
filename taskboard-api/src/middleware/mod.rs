/// Middleware modules for the API server
///
/// - `auth`: bearer-token authentication for protected routes
/// - `security`: hardening response headers

pub mod auth;
pub mod security;
