//! Token endpoint: `password` and `refresh_token` grants.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{attach_access_token, attach_refresh_token, rotate_refresh};
use crate::clock::Clock;
use crate::commands::{GrantType, IssueToken};
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::{DomainError, DomainResult};
use crate::mediator::{Handler, Reply};
use crate::models::user::User;
use crate::password::PasswordHasher;
use crate::repository::UserRepository;
use crate::token::TokenService;

/// Verified against when the username is unknown, so a miss costs the same
/// bcrypt work as a wrong password.
const DECOY_PASSWORD: &str = "tollgate-decoy-password";

pub struct IssueTokenHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    decoy_hash: Option<String>,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    config: Arc<AuthConfig>,
}

impl IssueTokenHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenService>,
        clock: Arc<dyn Clock>,
        config: Arc<AuthConfig>,
    ) -> Self {
        let decoy_hash = match hasher.hash(DECOY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "decoy password hash unavailable");
                None
            }
        };
        Self {
            users,
            hasher,
            decoy_hash,
            tokens,
            clock,
            config,
        }
    }

    async fn password_grant(
        &self,
        ctx: &RequestContext,
        command: IssueToken,
    ) -> DomainResult<User> {
        let username = required(command.username.as_deref(), "username")?;
        let password = required(command.password.as_deref(), "password")?;

        let user = ctx.guard(self.users.find_by_email(username)).await?;
        let verified = match &user {
            Some(user) => self.hasher.verify(password, &user.password_hash),
            None => {
                if let Some(decoy) = &self.decoy_hash {
                    self.hasher.verify(password, decoy);
                }
                false
            }
        };
        let mut user = match user {
            Some(user) if verified => user,
            _ => {
                debug!("password grant rejected");
                return Err(DomainError::InvalidCredentials);
            }
        };

        if let Some(scope) = command.scope.as_deref() {
            for s in scope.split_whitespace() {
                user.add_scope(s);
            }
        }

        let refresh = self.tokens.issue_refresh_token(user.id())?;
        attach_refresh_token(&mut user, refresh);
        attach_access_token(&self.tokens, &mut user)?;
        user.touch(self.clock.now());
        ctx.guard(self.users.update_user(&user)).await?;

        info!(user_id = %user.id(), "token pair issued");
        Ok(user)
    }

    async fn refresh_grant(
        &self,
        ctx: &RequestContext,
        command: IssueToken,
    ) -> DomainResult<User> {
        let presented = required(command.refresh_token.as_deref(), "refresh_token")?;
        let subject = match ctx.refresh_subject {
            Some(subject) => subject,
            None => self.tokens.validate_refresh_token(presented)?,
        };

        let user = rotate_refresh(ctx, self.users.as_ref(), &self.tokens, subject, presented).await?;
        info!(user_id = %user.id(), "token pair refreshed");
        Ok(user)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> DomainResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::Validation(format!("{field} is required"))),
    }
}

#[async_trait]
impl Handler<IssueToken> for IssueTokenHandler {
    async fn handle(&self, ctx: &RequestContext, command: IssueToken) -> DomainResult<Reply> {
        if !self
            .config
            .client_matches(&command.client_id, &command.client_secret)
        {
            debug!(client_id = %command.client_id, "unknown client");
            return Err(DomainError::InvalidClient);
        }

        let user = match command.grant() {
            Some(GrantType::Password) => self.password_grant(ctx, command).await?,
            Some(GrantType::RefreshToken) => self.refresh_grant(ctx, command).await?,
            None => {
                return Err(DomainError::InvalidGrant(format!(
                    "unsupported grant_type '{}'",
                    command.grant_type
                )));
            }
        };
        Ok(Reply::Authenticated(user))
    }
}
