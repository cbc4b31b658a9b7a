//! HTTP request handlers.

pub mod health;
pub mod oauth;
pub mod users;
