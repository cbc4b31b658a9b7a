//! Bearer token issuance and verification (HS256).
//!
//! Access tokens carry the principal's id, email, name and roles and expire
//! after 15 minutes. Refresh tokens carry only the subject id and a random
//! `jti` and expire after 7 days. Every verification failure is reported as
//! the same [`TokenError::Invalid`]; the concrete reason is only logged.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::models::auth::{AccessClaims, Principal, RefreshClaims, TokenUse};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// The only accepted signing algorithm.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token errors.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid or expired token")]
    Invalid,

    #[error("Signing secret is empty")]
    MissingSecret,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for DomainError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => DomainError::InvalidToken,
            other => DomainError::unclassified(other),
        }
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed bearer tokens with an injected secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Build a service signing with `secret`. An empty secret is rejected.
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked against the injected clock with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
            access_ttl: Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            refresh_ttl: Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        })
    }

    /// Override the default lifetimes.
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an access token for `principal`.
    pub fn issue_access_token(&self, principal: &Principal) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            roles: principal.roles.iter().cloned().collect(),
            token_use: TokenUse::Access,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    /// Sign a refresh token for `principal_id`. Persisting it is the caller's job.
    pub fn issue_refresh_token(&self, principal_id: Uuid) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.refresh_ttl;
        let claims = RefreshClaims {
            sub: principal_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_use: TokenUse::Refresh,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(IssuedToken {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    /// Verify an access token and extract its principal.
    pub fn validate_access_token(&self, token: &str) -> Result<Principal, TokenError> {
        let claims: AccessClaims = self.decode(token)?;
        self.check(claims.token_use, TokenUse::Access, claims.exp)?;
        let id = parse_subject(&claims.sub)?;
        Ok(Principal {
            id,
            email: claims.email,
            name: claims.name,
            roles: claims.roles.into_iter().collect(),
        })
    }

    /// Verify a refresh token and extract its subject id.
    ///
    /// Whether the token is the one currently stored for the subject is not
    /// checked here.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims: RefreshClaims = self.decode(token)?;
        self.check(claims.token_use, TokenUse::Refresh, claims.exp)?;
        parse_subject(&claims.sub)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(format!("jwt encode: {e}")))
    }

    fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<C>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(reason = %e, "token rejected");
                TokenError::Invalid
            })
    }

    fn check(&self, actual: TokenUse, expected: TokenUse, exp: i64) -> Result<(), TokenError> {
        if actual != expected {
            debug!(?actual, ?expected, "token rejected: wrong token use");
            return Err(TokenError::Invalid);
        }
        if exp <= self.clock.now().timestamp() {
            debug!(exp, "token rejected: expired");
            return Err(TokenError::Invalid);
        }
        Ok(())
    }
}

fn parse_subject(sub: &str) -> Result<Uuid, TokenError> {
    Uuid::parse_str(sub).map_err(|e| {
        debug!(reason = %e, "token rejected: malformed subject");
        TokenError::Invalid
    })
}

/// SHA-256 hex digest of a token, used for storage and comparison.
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
