//! Per-request context handed to every command handler.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::auth::Principal;

/// Request-scoped values attached by the transport and its gates.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Principal from a validated access token, if the route authenticated one.
    pub principal: Option<Principal>,
    /// Subject of a refresh token already validated by the refresh gate.
    pub refresh_subject: Option<Uuid>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            principal: None,
            refresh_subject: None,
            cancel,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_refresh_subject(mut self, subject: Uuid) -> Self {
        self.refresh_subject = Some(subject);
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `fut` unless the request is cancelled first.
    ///
    /// Cancellation wins ties and yields [`DomainError::Cancelled`].
    pub async fn guard<F, T, E>(&self, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DomainError>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DomainError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }
}
