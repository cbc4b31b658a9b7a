//! Password hashing via bcrypt.

use thiserror::Error;

use crate::error::DomainError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Password hashing errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt hash: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<PasswordError> for DomainError {
    fn from(e: PasswordError) -> Self {
        DomainError::unclassified(e)
    }
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Check `password` against a stored hash. A malformed hash verifies as
    /// `false` rather than failing.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// bcrypt-backed hasher.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::debug!(reason = %e, "bcrypt verify failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(hasher.verify("secret1", &hash));
        assert!(!hasher.verify("secret2", &hash));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        let hasher = BcryptHasher::new(4);
        assert!(!hasher.verify("secret1", "not-a-bcrypt-hash"));
    }

    #[test]
    fn invalid_cost_is_unclassified() {
        let hasher = BcryptHasher::new(1);
        let err: DomainError = hasher.hash("secret1").unwrap_err().into();
        assert!(err.is_internal());
    }
}
