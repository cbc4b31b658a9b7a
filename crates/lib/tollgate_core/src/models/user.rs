//! User entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::Principal;

/// Provider name for accounts authenticated with a local password.
pub const LOCAL_PROVIDER: &str = "local";

/// Role every new account starts with.
pub const DEFAULT_ROLE: &str = "user";

/// Identity fields owned by every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Fresh identity with a time-ordered id.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Record a modification.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

/// Account record owned by the repository.
///
/// `access_token` and `refresh_token` only carry plaintext tokens on handler
/// output; the store keeps the refresh token's digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    identity: Identity,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub provider: String,
    pub provider_id: String,
    pub access_token: Option<String>,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub refresh_token_digest: Option<String>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl User {
    /// New password-authenticated account with the default role.
    pub fn new_local(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.into();
        Self {
            identity: Identity::new(now),
            name: name.into(),
            provider_id: email.clone(),
            email,
            password_hash: password_hash.into(),
            roles: vec![DEFAULT_ROLE.to_string()],
            scopes: Vec::new(),
            provider: LOCAL_PROVIDER.to_string(),
            access_token: None,
            access_expires_at: None,
            refresh_token: None,
            refresh_token_digest: None,
            refresh_expires_at: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn id(&self) -> Uuid {
        self.identity.id()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.identity.created_at()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.identity.touch(now);
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn add_role(&mut self, role: &str) {
        if !self.has_role(role) {
            self.roles.push(role.to_string());
        }
    }

    pub fn remove_role(&mut self, role: &str) {
        self.roles.retain(|r| r != role);
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn add_scope(&mut self, scope: &str) {
        if !self.has_scope(scope) {
            self.scopes.push(scope.to_string());
        }
    }

    /// The identity carried in this user's access tokens.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id(),
            email: self.email.clone(),
            name: self.name.clone(),
            roles: self.roles.iter().cloned().collect::<BTreeSet<_>>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> User {
        User::new_local("Ana", "ana@x.com", "hash", Utc::now())
    }

    #[test]
    fn new_local_user_has_defaults() {
        let user = ana();
        assert_eq!(user.roles, vec!["user"]);
        assert_eq!(user.provider, LOCAL_PROVIDER);
        assert_eq!(user.provider_id, "ana@x.com");
        assert!(user.identity().updated_at().is_none());
        assert!(user.refresh_token_digest.is_none());
    }

    #[test]
    fn roles_are_not_duplicated() {
        let mut user = ana();
        user.add_role("admin");
        user.add_role("admin");
        assert_eq!(user.roles, vec!["user", "admin"]);
        user.remove_role("user");
        assert!(!user.has_role("user"));
        assert!(user.has_role("admin"));
    }

    #[test]
    fn scopes_are_not_duplicated() {
        let mut user = ana();
        user.add_scope("read");
        user.add_scope("read");
        assert_eq!(user.scopes, vec!["read"]);
        assert!(user.has_scope("read"));
    }

    #[test]
    fn principal_carries_identity_and_roles() {
        let mut user = ana();
        user.add_role("admin");
        let principal = user.principal();
        assert_eq!(principal.id, user.id());
        assert_eq!(principal.email, "ana@x.com");
        assert!(principal.has_role("admin"));
        assert!(principal.has_role("user"));
    }

    #[test]
    fn serialized_user_omits_secrets() {
        let mut user = ana();
        user.refresh_token_digest = Some("digest".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token_digest").is_none());
        assert_eq!(json["email"], "ana@x.com");
    }
}
