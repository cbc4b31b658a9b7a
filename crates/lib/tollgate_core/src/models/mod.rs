//! Domain models.
//!
//! These are internal domain shapes, distinct from the wire models in
//! `tollgate_api` (which carry `#[serde(rename)]` for camelCase etc.).

pub mod auth;
pub mod user;

pub use auth::{AccessClaims, Principal, RefreshClaims, TokenUse};
pub use user::{Identity, User};
