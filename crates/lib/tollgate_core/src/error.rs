//! Domain error taxonomy.
//!
//! `DomainError` is the only error type that crosses the mediator boundary
//! with status-code semantics. Every variant carries a stable numeric code so
//! clients can tell apart failures that share an HTTP status (for instance
//! `InvalidClient` and `InvalidCredentials`, both 401).

use thiserror::Error;

use crate::commands::CommandKind;
use crate::mapper::MappingError;

/// Convenience alias for core return types.
pub type DomainResult<T> = Result<T, DomainError>;

/// Generic message shown to clients for internal failures.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Classified failures produced by handlers, the token service and the mediator.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid client")]
    InvalidClient,

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User already exists")]
    UserAlreadyExists { email: String },

    #[error("User not found")]
    UserNotFound,

    #[error("Request cancelled")]
    Cancelled,

    #[error("No handler registered for command {0}")]
    NoHandlerRegistered(CommandKind),

    #[error("Mapping failure: {0}")]
    Mapping(#[from] MappingError),

    #[error("Unclassified error: {0}")]
    Unclassified(String),
}

impl DomainError {
    /// Build an unclassified error from any displayable cause.
    pub fn unclassified(cause: impl std::fmt::Display) -> Self {
        Self::Unclassified(cause.to_string())
    }

    /// Stable numeric code for programmatic handling.
    pub fn code(&self) -> u16 {
        match self {
            Self::UserAlreadyExists { .. } => 1,
            Self::InvalidCredentials => 2,
            Self::InvalidToken => 3,
            Self::InvalidClient => 4,
            Self::InvalidGrant(_) => 5,
            Self::Validation(_) => 6,
            Self::Unauthorized(_) => 7,
            Self::Forbidden(_) => 8,
            Self::UserNotFound => 9,
            Self::Cancelled => 10,
            Self::NoHandlerRegistered(_) => 90,
            Self::Mapping(_) => 91,
            Self::Unclassified(_) => 99,
        }
    }

    /// HTTP-style status hint. Internal failures report 500; the transport
    /// layer may substitute its configured fallback.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidGrant(_) => 400,
            Self::InvalidCredentials
            | Self::InvalidClient
            | Self::InvalidToken
            | Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::UserNotFound => 404,
            Self::UserAlreadyExists { .. } => 409,
            Self::Cancelled => 503,
            Self::NoHandlerRegistered(_) | Self::Mapping(_) | Self::Unclassified(_) => 500,
        }
    }

    /// True for failures that are programmer or infrastructure errors rather
    /// than expected policy outcomes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::NoHandlerRegistered(_) | Self::Mapping(_) | Self::Unclassified(_)
        )
    }

    /// Message safe to show to any client.
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    /// Detail intended for trusted/debug contexts only.
    pub fn internal_message(&self) -> Option<String> {
        match self {
            Self::UserAlreadyExists { email } => {
                Some(format!("email '{email}' is already registered"))
            }
            Self::NoHandlerRegistered(_) | Self::Mapping(_) | Self::Unclassified(_) => {
                Some(self.to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_errors_sharing_a_status() {
        let client = DomainError::InvalidClient;
        let creds = DomainError::InvalidCredentials;
        assert_eq!(client.status(), creds.status());
        assert_ne!(client.code(), creds.code());
    }

    #[test]
    fn duplicate_user_maps_to_conflict() {
        let err = DomainError::UserAlreadyExists {
            email: "ana@x.com".into(),
        };
        assert_eq!(err.status(), 409);
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn internal_errors_hide_detail_from_clients() {
        let err = DomainError::unclassified("connection pool exhausted");
        assert!(err.is_internal());
        assert_eq!(err.client_message(), INTERNAL_MESSAGE);
        assert!(
            err.internal_message()
                .unwrap()
                .contains("connection pool exhausted")
        );
    }

    #[test]
    fn classified_errors_expose_their_message() {
        let err = DomainError::Forbidden("missing role 'admin'".into());
        assert!(!err.is_internal());
        assert_eq!(err.status(), 403);
        assert_eq!(err.client_message(), "Forbidden: missing role 'admin'");
        assert!(err.internal_message().is_none());
    }
}
