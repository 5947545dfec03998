//! One-way password hashing.

use anyhow::{Context, Result};

/// Salted bcrypt hashing with a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower costs are only appropriate for tests.
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh salt.
    ///
    /// # Errors
    /// Fails only if the underlying hash cannot be computed.
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).context("failed to hash password")
    }

    /// Verify a password against a stored digest.
    ///
    /// A malformed digest verifies as `false`: a corrupted hash must
    /// never be treated as "no password".
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        bcrypt::verify(password, digest).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        // Minimum cost keeps the test suite fast.
        PasswordHasher::with_cost(4)
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hasher = hasher();
        let digest = hasher.hash("TestPassword123!").unwrap();
        assert_ne!(digest, "TestPassword123!");
        assert!(hasher.verify("TestPassword123!", &digest));
        assert!(!hasher.verify("WrongPassword", &digest));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("TestPassword123!").unwrap();
        let second = hasher.hash("TestPassword123!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_digest_verifies_false() {
        let hasher = hasher();
        assert!(!hasher.verify("TestPassword123!", ""));
        assert!(!hasher.verify("TestPassword123!", "not-a-bcrypt-digest"));
        assert!(!hasher.verify("TestPassword123!", "$2b$tampered"));
    }
}
