//! User storage boundary.
//!
//! Handlers only touch users through [`UserRepository`]. Implementations
//! must make `create_user` (check email, then insert) and
//! `rotate_refresh_token` (compare, then swap) atomic.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::user::User;

pub use memory::InMemoryUserRepository;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for DomainError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateEmail(email) => DomainError::UserAlreadyExists { email },
            RepositoryError::NotFound(_) => DomainError::UserNotFound,
            RepositoryError::Storage(msg) => DomainError::unclassified(msg),
        }
    }
}

/// Replacement refresh token state written by a successful rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRotation {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

/// Keyed user store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert `user` unless its email is taken.
    async fn create_user(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Overwrite the stored record with the same id.
    async fn update_user(&self, user: &User) -> Result<(), RepositoryError>;

    /// Replace the stored refresh digest with `next` only if it currently
    /// equals `expected_digest`. Returns whether the swap happened.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected_digest: &str,
        next: RefreshRotation,
    ) -> Result<bool, RepositoryError>;
}
