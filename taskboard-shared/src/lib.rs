//! # Taskboard Shared Library
//!
//! Domain types, persistence, access policy and the service layer used by
//! the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `models`: Entity types and their PostgreSQL queries
//! - `db`: Connection pool and embedded migrations
//! - `store`: The `Store` persistence trait (PostgreSQL and in-memory)
//! - `auth`: Passwords, bearer tokens, identity verification and access policy
//! - `events`: Live update events, rooms and the `EventPublisher` trait
//! - `services`: Project, task, comment, notification, dashboard and account operations
//! - `error`: Service-level error type

pub mod auth;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
