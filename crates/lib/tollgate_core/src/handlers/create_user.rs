//! Local account registration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::clock::Clock;
use crate::commands::CreateUser;
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::{DomainError, DomainResult};
use crate::mediator::{Handler, Reply};
use crate::models::user::User;
use crate::password::PasswordHasher;
use crate::repository::UserRepository;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Role granted to accounts listed in [`AuthConfig::admin_emails`].
pub const ADMIN_ROLE: &str = "admin";

pub struct CreateUserHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    config: Arc<AuthConfig>,
}

impl CreateUserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            users,
            hasher,
            clock,
            config,
        }
    }
}

fn validate(command: &CreateUser) -> DomainResult<()> {
    if command.name.trim().is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    match command.email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(DomainError::Validation("email is invalid".into())),
    }
    if command.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait]
impl Handler<CreateUser> for CreateUserHandler {
    async fn handle(&self, ctx: &RequestContext, command: CreateUser) -> DomainResult<Reply> {
        validate(&command)?;

        let password_hash = self.hasher.hash(&command.password)?;
        let email = command.email.trim();
        let mut user = User::new_local(command.name.trim(), email, password_hash, self.clock.now());
        if self.config.is_admin_email(email) {
            user.add_role(ADMIN_ROLE);
        }

        let user = ctx.guard(self.users.create_user(user)).await?;
        info!(user_id = %user.id(), "user registered");
        Ok(Reply::Created(user))
    }
}
