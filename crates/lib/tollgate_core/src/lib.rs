//! # tollgate_core
//!
//! Core domain logic for Tollgate: command mediator, object mapper, bearer
//! token service and the account handlers built on them.

pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod mapper;
pub mod mediator;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
