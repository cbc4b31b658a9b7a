//! Refresh token exchange.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::rotate_refresh;
use crate::commands::RefreshToken;
use crate::context::RequestContext;
use crate::error::{DomainError, DomainResult};
use crate::mediator::{Handler, Reply};
use crate::repository::UserRepository;
use crate::token::TokenService;

pub struct RefreshTokenHandler {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl RefreshTokenHandler {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }
}

#[async_trait]
impl Handler<RefreshToken> for RefreshTokenHandler {
    async fn handle(&self, ctx: &RequestContext, command: RefreshToken) -> DomainResult<Reply> {
        if command.refresh_token.is_empty() {
            return Err(DomainError::Validation("refresh_token is required".into()));
        }
        let subject = self.tokens.validate_refresh_token(&command.refresh_token)?;
        let user = rotate_refresh(
            ctx,
            self.users.as_ref(),
            &self.tokens,
            subject,
            &command.refresh_token,
        )
        .await?;
        info!(user_id = %user.id(), "access token refreshed");
        Ok(Reply::Authenticated(user))
    }
}
