//! Password strength rules.
//!
//! The policy is the first gate when creating a user or changing a
//! password; it is never applied retroactively to stored hashes.

/// Punctuation accepted as the required special character.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

const MIN_PASSWORD_LENGTH: usize = 8;

/// A rule the candidate password failed; Display text is shown to the
/// user verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one number")]
    MissingDigit,
    #[error("Password must contain at least one special character")]
    MissingSymbol,
}

/// Stateless password validator. Rules are checked in a fixed order and
/// the first failure wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordPolicy;

impl PasswordPolicy {
    /// Check the candidate against every rule.
    ///
    /// # Errors
    /// Returns the first [`PolicyViolation`] the password fails.
    pub fn validate(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(PolicyViolation::TooShort);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PolicyViolation::MissingUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PolicyViolation::MissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyViolation::MissingDigit);
        }
        if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
            return Err(PolicyViolation::MissingSymbol);
        }
        Ok(())
    }
}
