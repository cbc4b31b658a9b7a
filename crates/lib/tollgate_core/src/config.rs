//! Authentication configuration.

use std::fmt;

use thiserror::Error;

use crate::password::DEFAULT_BCRYPT_COST;

/// Cost range accepted by bcrypt.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Secrets and policy for token issuance. Built once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC signing secret.
    pub jwt_secret: String,
    /// The single registered OAuth2 client.
    pub client_id: String,
    pub client_secret: String,
    /// Accounts registered with one of these emails get the `admin` role.
    pub admin_emails: Vec<String>,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            admin_emails: Vec::new(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_emails = emails.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Reject empty secrets and out-of-range bcrypt costs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("OAUTH2_CLIENT_ID"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("OAUTH2_CLIENT_SECRET"));
        }
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                reason: format!(
                    "{} is outside {}..={}",
                    self.bcrypt_cost,
                    BCRYPT_COST_RANGE.start(),
                    BCRYPT_COST_RANGE.end()
                ),
            });
        }
        Ok(())
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }

    pub fn client_matches(&self, client_id: &str, client_secret: &str) -> bool {
        self.client_id == client_id && self.client_secret == client_secret
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("admin_emails", &self.admin_emails)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}
