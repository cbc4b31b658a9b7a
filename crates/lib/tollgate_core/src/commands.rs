//! Commands accepted by the mediator.
//!
//! Each command is an immutable value built by the transport layer from a
//! decoded payload. [`Command`] is the closed set of everything the mediator
//! can route; [`CommandKind`] is its discriminant, used as dispatch key and
//! log field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateUser,
    IssueToken,
    RefreshToken,
}

impl CommandKind {
    pub const ALL: [CommandKind; 3] = [Self::CreateUser, Self::IssueToken, Self::RefreshToken];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateUser => "CreateUser",
            Self::IssueToken => "IssueToken",
            Self::RefreshToken => "RefreshToken",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register a local account.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supported values of `grant_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub const PASSWORD: &'static str = "password";
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Parse a wire grant type. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            Self::PASSWORD => Some(Self::Password),
            Self::REFRESH_TOKEN => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

/// Token endpoint request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueToken {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scope: Option<String>,
    pub refresh_token: Option<String>,
}

impl IssueToken {
    pub fn grant(&self) -> Option<GrantType> {
        GrantType::parse(&self.grant_type)
    }
}

impl fmt::Debug for IssueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueToken")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Exchange a refresh token for a new token pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken").finish_non_exhaustive()
    }
}

/// Every command the mediator can route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateUser(CreateUser),
    IssueToken(IssueToken),
    RefreshToken(RefreshToken),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateUser(_) => CommandKind::CreateUser,
            Self::IssueToken(_) => CommandKind::IssueToken,
            Self::RefreshToken(_) => CommandKind::RefreshToken,
        }
    }
}

impl From<CreateUser> for Command {
    fn from(c: CreateUser) -> Self {
        Self::CreateUser(c)
    }
}

impl From<IssueToken> for Command {
    fn from(c: IssueToken) -> Self {
        Self::IssueToken(c)
    }
}

impl From<RefreshToken> for Command {
    fn from(c: RefreshToken) -> Self {
        Self::RefreshToken(c)
    }
}
