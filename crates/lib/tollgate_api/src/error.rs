//! Application error types.
//!
//! Handlers return [`AppError`], a thin wrapper over [`DomainError`]. Its
//! response is rendered with the kind's status and a client-safe body; the
//! [`apply_error_policy`] layer then applies the configured [`ErrorPolicy`]
//! to internal failures.

use axum::{
    Json,
    extract::{
        Request, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tollgate_core::error::DomainError;
use tollgate_core::mapper::MappingError;
use tracing::{debug, error};

use crate::config::ErrorPolicy;
use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Transport wrapper for domain failures.
#[derive(Debug)]
pub struct AppError(pub DomainError);

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl From<MappingError> for AppError {
    fn from(e: MappingError) -> Self {
        Self(DomainError::Mapping(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self(DomainError::Validation(e.body_text()))
    }
}

impl From<FormRejection> for AppError {
    fn from(e: FormRejection) -> Self {
        Self(DomainError::Validation(e.body_text()))
    }
}

/// Error details carried on the response for [`apply_error_policy`].
#[derive(Debug, Clone)]
struct RenderedError {
    internal: bool,
    body: ErrorResponse,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let internal = err.is_internal();
        if internal {
            error!(code = err.code(), error = %err, "request failed");
        } else {
            debug!(code = err.code(), error = %err, "request rejected");
        }

        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            code: err.code(),
            message: err.client_message(),
            internal_message: err.internal_message(),
        };
        let public = ErrorResponse {
            internal_message: None,
            ..body.clone()
        };

        let mut response = (status, Json(public)).into_response();
        response
            .extensions_mut()
            .insert(RenderedError { internal, body });
        response
    }
}

/// Middleware: apply the fallback status to internal failures and attach
/// `internalMessage` when exposure is enabled.
pub async fn apply_error_policy(
    State(policy): State<ErrorPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(rendered) = response.extensions_mut().remove::<RenderedError>() else {
        return response;
    };

    let expose = policy.expose_internal && rendered.body.internal_message.is_some();
    if !rendered.internal && !expose {
        return response;
    }

    let status = if rendered.internal {
        policy.fallback_status
    } else {
        response.status()
    };
    let body = ErrorResponse {
        internal_message: if expose {
            rendered.body.internal_message
        } else {
            None
        },
        ..rendered.body
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_error_uses_its_status() {
        let response = AppError(DomainError::Forbidden("missing role 'admin'".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_error_defaults_to_500() {
        let response = AppError(DomainError::unclassified("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let rendered = response.extensions().get::<RenderedError>().unwrap();
        assert!(rendered.internal);
        assert_eq!(rendered.body.message, "Internal server error");
        assert!(rendered.body.internal_message.is_some());
    }
}
