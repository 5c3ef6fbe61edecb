//! # Reviora Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the Reviora API server and background jobs.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and authorization utilities
//! - `limits`: Plan limit enforcement for subscription tiers
//! - `subscription`: Admin-reviewed plan upgrade workflow
//! - `email`: Transactional email notifications
//! - `db`: Connection pooling and migrations

pub mod auth;
pub mod db;
pub mod email;
pub mod limits;
pub mod models;
pub mod subscription;

/// Current version of the Reviora shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
