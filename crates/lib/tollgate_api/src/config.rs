//! API server configuration.

use axum::http::StatusCode;
use tollgate_core::config::AuthConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// Token issuance secrets and policy.
    pub auth: AuthConfig,
    /// How internal failures are rendered.
    pub errors: ErrorPolicy,
}

/// Rendering policy for internal failures (no handler, mapping bugs,
/// unclassified errors).
#[derive(Clone, Copy, Debug)]
pub struct ErrorPolicy {
    /// Status used for internal failures.
    pub fallback_status: StatusCode,
    /// Include `internalMessage` in error bodies. Only for trusted deployments.
    pub expose_internal: bool,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            fallback_status: StatusCode::INTERNAL_SERVER_ERROR,
            expose_internal: false,
        }
    }
}
