//! In-process user store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{RefreshRotation, RepositoryError, UserRepository};
use crate::models::user::User;

/// `HashMap` behind a tokio `RwLock`. Every mutation holds the write lock for
/// its whole check-then-write, which gives the required atomicity.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(RepositoryError::DuplicateEmail(user.email));
        }
        debug!(user_id = %user.id(), "user inserted");
        users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| same_email(&u.email, email)).cloned())
    }

    async fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.provider == provider && u.provider_id == provider_id)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&user.id()) else {
            return Err(RepositoryError::NotFound(user.id()));
        };
        *stored = user.clone();
        // Plaintext tokens are handler output only.
        stored.access_token = None;
        stored.refresh_token = None;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected_digest: &str,
        next: RefreshRotation,
    ) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&id) else {
            return Err(RepositoryError::NotFound(id));
        };
        if stored.refresh_token_digest.as_deref() != Some(expected_digest) {
            debug!(user_id = %id, "refresh rotation rejected: digest mismatch");
            return Ok(false);
        }
        stored.refresh_token_digest = Some(next.digest);
        stored.refresh_expires_at = Some(next.expires_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::LOCAL_PROVIDER;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new_local("Ana", email, "hash", Utc::now())
    }

    #[tokio::test]
    async fn create_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create_user(user("ana@x.com")).await.unwrap();

        let by_id = repo.find_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ana@x.com");
        let by_email = repo.find_by_email("ANA@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id(), created.id());
        let by_provider = repo
            .find_by_provider_id(LOCAL_PROVIDER, "ana@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_provider.id(), created.id());
        assert!(repo.find_by_email("bob@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(user("ana@x.com")).await.unwrap();
        let err = repo.create_user(user("ana@x.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateEmail(e) if e == "ana@x.com"));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_admit_exactly_one() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_user(user("ana@x.com")).await })
            })
            .collect();

        let mut ok = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn update_strips_plaintext_tokens() {
        let repo = InMemoryUserRepository::new();
        let mut u = repo.create_user(user("ana@x.com")).await.unwrap();
        u.add_role("admin");
        u.access_token = Some("plain".into());
        u.refresh_token = Some("plain".into());
        repo.update_user(&u).await.unwrap();

        let stored = repo.find_by_id(u.id()).await.unwrap().unwrap();
        assert!(stored.has_role("admin"));
        assert!(stored.access_token.is_none());
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_user_fails() {
        let repo = InMemoryUserRepository::new();
        let err = repo.update_user(&user("ana@x.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn rotation_is_compare_and_swap() {
        let repo = InMemoryUserRepository::new();
        let mut u = user("ana@x.com");
        u.refresh_token_digest = Some("d1".into());
        let u = repo.create_user(u).await.unwrap();
        let next = |digest: &str| RefreshRotation {
            digest: digest.into(),
            expires_at: Utc::now() + Duration::days(7),
        };

        assert!(repo.rotate_refresh_token(u.id(), "d1", next("d2")).await.unwrap());
        assert!(!repo.rotate_refresh_token(u.id(), "d1", next("d3")).await.unwrap());

        let stored = repo.find_by_id(u.id()).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_digest.as_deref(), Some("d2"));
    }

    #[tokio::test]
    async fn concurrent_rotations_admit_exactly_one() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mut u = user("ana@x.com");
        u.refresh_token_digest = Some("d1".into());
        let id = repo.create_user(u).await.unwrap().id();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let next = RefreshRotation {
                        digest: format!("next-{i}"),
                        expires_at: Utc::now(),
                    };
                    repo.rotate_refresh_token(id, "d1", next).await.unwrap()
                })
            })
            .collect();

        let mut swapped = 0;
        for task in tasks {
            if task.await.unwrap() {
                swapped += 1;
            }
        }
        assert_eq!(swapped, 1);
    }
}
