//! Command handlers.

pub mod create_user;
pub mod issue_token;
pub mod refresh_token;

use tracing::warn;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{DomainError, DomainResult};
use crate::models::user::User;
use crate::repository::{RefreshRotation, UserRepository};
use crate::token::{self, IssuedToken, TokenService};

pub use create_user::CreateUserHandler;
pub use issue_token::IssueTokenHandler;
pub use refresh_token::RefreshTokenHandler;

/// Put a freshly signed access token on `user`.
fn attach_access_token(tokens: &TokenService, user: &mut User) -> DomainResult<()> {
    let access = tokens.issue_access_token(&user.principal())?;
    user.access_token = Some(access.token);
    user.access_expires_at = Some(access.expires_at);
    Ok(())
}

/// Put a freshly signed refresh token and its digest on `user`.
fn attach_refresh_token(user: &mut User, refresh: IssuedToken) -> RefreshRotation {
    let rotation = RefreshRotation {
        digest: token::digest(&refresh.token),
        expires_at: refresh.expires_at,
    };
    user.refresh_token = Some(refresh.token);
    user.refresh_token_digest = Some(rotation.digest.clone());
    user.refresh_expires_at = Some(rotation.expires_at);
    rotation
}

/// Exchange `presented` for a new token pair.
///
/// The stored digest is swapped atomically, so a superseded or replayed
/// refresh token fails with `InvalidToken` and at most one of several
/// concurrent refreshes with the same token succeeds.
async fn rotate_refresh(
    ctx: &RequestContext,
    users: &dyn UserRepository,
    tokens: &TokenService,
    subject: Uuid,
    presented: &str,
) -> DomainResult<User> {
    let mut user = ctx
        .guard(users.find_by_id(subject))
        .await?
        .ok_or(DomainError::InvalidToken)?;

    let refresh = tokens.issue_refresh_token(subject)?;
    let rotation = attach_refresh_token(&mut user, refresh);
    let rotated = ctx
        .guard(users.rotate_refresh_token(subject, &token::digest(presented), rotation))
        .await?;
    if !rotated {
        warn!(user_id = %subject, "refresh token does not match stored value");
        return Err(DomainError::InvalidToken);
    }

    attach_access_token(tokens, &mut user)?;
    Ok(user)
}
