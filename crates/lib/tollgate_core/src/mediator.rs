//! Command mediator.
//!
//! Routes each [`Command`] to the single handler registered for its kind.
//! Handlers are registered on a [`MediatorBuilder`] during startup; the built
//! [`Mediator`] is immutable, so registration while serving cannot happen.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::commands::{Command, CommandKind, CreateUser, IssueToken, RefreshToken};
use crate::context::RequestContext;
use crate::error::{DomainError, DomainResult};
use crate::models::user::User;

/// Successful handler output.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A newly created account.
    Created(User),
    /// An account with freshly issued token fields populated.
    Authenticated(User),
}

impl Reply {
    pub fn user(&self) -> &User {
        match self {
            Self::Created(user) | Self::Authenticated(user) => user,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Self::Created(user) | Self::Authenticated(user) => user,
        }
    }
}

/// Business logic for one command type.
#[async_trait]
pub trait Handler<C: Send + 'static>: Send + Sync {
    async fn handle(&self, ctx: &RequestContext, command: C) -> DomainResult<Reply>;
}

type Slot<C> = Option<Arc<dyn Handler<C>>>;

/// Command types the mediator has a slot for.
pub trait Routed: Send + Sized + 'static {
    const KIND: CommandKind;

    #[doc(hidden)]
    fn slot(builder: &mut MediatorBuilder) -> &mut Slot<Self>;
}

impl Routed for CreateUser {
    const KIND: CommandKind = CommandKind::CreateUser;

    fn slot(builder: &mut MediatorBuilder) -> &mut Slot<Self> {
        &mut builder.create_user
    }
}

impl Routed for IssueToken {
    const KIND: CommandKind = CommandKind::IssueToken;

    fn slot(builder: &mut MediatorBuilder) -> &mut Slot<Self> {
        &mut builder.issue_token
    }
}

impl Routed for RefreshToken {
    const KIND: CommandKind = CommandKind::RefreshToken;

    fn slot(builder: &mut MediatorBuilder) -> &mut Slot<Self> {
        &mut builder.refresh_token
    }
}

/// Startup-time handler registration.
#[derive(Default)]
pub struct MediatorBuilder {
    create_user: Slot<CreateUser>,
    issue_token: Slot<IssueToken>,
    refresh_token: Slot<RefreshToken>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `C`, replacing any earlier one.
    pub fn register<C: Routed>(mut self, handler: Arc<dyn Handler<C>>) -> Self {
        let slot = C::slot(&mut self);
        if slot.is_some() {
            warn!(command = %C::KIND, "handler registered twice; replacing");
        }
        *slot = Some(handler);
        self
    }

    pub fn build(self) -> Mediator {
        let mediator = Mediator {
            create_user: self.create_user,
            issue_token: self.issue_token,
            refresh_token: self.refresh_token,
        };
        for kind in CommandKind::ALL {
            if !mediator.handles(kind) {
                warn!(command = %kind, "no handler registered");
            }
        }
        mediator
    }
}

/// Immutable command router.
pub struct Mediator {
    create_user: Slot<CreateUser>,
    issue_token: Slot<IssueToken>,
    refresh_token: Slot<RefreshToken>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    pub fn handles(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::CreateUser => self.create_user.is_some(),
            CommandKind::IssueToken => self.issue_token.is_some(),
            CommandKind::RefreshToken => self.refresh_token.is_some(),
        }
    }

    /// Route `command` to its handler and return the handler's result unchanged.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        command: impl Into<Command>,
    ) -> DomainResult<Reply> {
        let command = command.into();
        let kind = command.kind();
        debug!(command = %kind, "dispatching");
        match command {
            Command::CreateUser(c) => dispatch(&self.create_user, ctx, c).await,
            Command::IssueToken(c) => dispatch(&self.issue_token, ctx, c).await,
            Command::RefreshToken(c) => dispatch(&self.refresh_token, ctx, c).await,
        }
    }
}

async fn dispatch<C: Routed>(
    slot: &Slot<C>,
    ctx: &RequestContext,
    command: C,
) -> DomainResult<Reply> {
    match slot {
        Some(handler) => handler.handle(ctx, command).await,
        None => Err(DomainError::NoHandlerRegistered(C::KIND)),
    }
}
