//! Authentication middleware: bearer extraction, role checks and the
//! refresh-grant gate in front of the token endpoint.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tollgate_core::commands::GrantType;
use tollgate_core::error::DomainError;
use tollgate_core::models::auth::Principal;
use tracing::debug;
use url::form_urlencoded;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// Largest token request body the refresh gate will buffer.
const MAX_FORM_BYTES: usize = 16 * 1024;

/// Key used to store the validated [`Principal`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// A refresh token validated by [`refresh_gate`].
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub subject: Uuid,
    pub token: String,
}

/// State for [`require_role`].
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    role: &'static str,
}

impl RoleGate {
    pub fn new(role: &'static str) -> Self {
        Self { role }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, DomainError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::Unauthorized("Missing authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| DomainError::Unauthorized("Invalid authorization scheme".into()))
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, validates it as
/// an access token and injects [`AuthenticatedPrincipal`] into request
/// extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let principal = state
        .tokens
        .validate_access_token(token)
        .map_err(|_| DomainError::Unauthorized("Invalid or expired token".into()))?;

    debug!(user_id = %principal.id, "request authenticated");
    request
        .extensions_mut()
        .insert(AuthenticatedPrincipal(principal));
    Ok(next.run(request).await)
}

/// Axum middleware: requires the principal attached by [`authenticate`] to
/// hold the gate's role. Must be layered inside `authenticate`.
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(AuthenticatedPrincipal(principal)) =
        request.extensions().get::<AuthenticatedPrincipal>()
    else {
        return Err(DomainError::Unauthorized("Authentication required".into()).into());
    };
    if !principal.has_role(gate.role) {
        debug!(user_id = %principal.id, role = gate.role, "role check failed");
        return Err(DomainError::Forbidden(format!("missing role '{}'", gate.role)).into());
    }
    Ok(next.run(request).await)
}

/// Axum middleware for the token endpoint.
///
/// For `grant_type=refresh_token` the refresh token (form field, or the
/// bearer header when the field is absent) is validated here and a
/// [`RefreshGrant`] is attached. Other grant types pass through untouched.
pub async fn refresh_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| DomainError::Validation(format!("unreadable request body: {e}")))?;

    let mut grant_type = None;
    let mut form_token = None;
    for (key, value) in form_urlencoded::parse(&bytes) {
        match key.as_ref() {
            "grant_type" => grant_type = Some(value.into_owned()),
            "refresh_token" => form_token = Some(value.into_owned()),
            _ => {}
        }
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    if grant_type.as_deref() != Some(GrantType::REFRESH_TOKEN) {
        return Ok(next.run(request).await);
    }

    let token = match form_token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => bearer_token(request.headers())
            .map_err(|_| DomainError::Unauthorized("Missing refresh token".into()))?
            .to_string(),
    };
    let subject = state
        .tokens
        .validate_refresh_token(&token)
        .map_err(DomainError::from)?;

    debug!(user_id = %subject, "refresh grant admitted");
    request
        .extensions_mut()
        .insert(RefreshGrant { subject, token });
    Ok(next.run(request).await)
}
