//! Password strength policy

use crate::{config::AppConfig, error::AppError};
use thiserror::Error;

/// Characters that satisfy the special-character rule
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// The first rule a password failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Password must be at least {0} characters long")]
    TooShort(usize),

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSpecial,
}

impl From<PolicyViolation> for AppError {
    fn from(v: PolicyViolation) -> Self {
        AppError::Validation(v.to_string())
    }
}

/// Rules applied to new and changed passwords
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.security.password_min_length)
    }

    /// Check rules in order; the first failure wins
    pub fn validate(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.chars().count() < self.min_length {
            return Err(PolicyViolation::TooShort(self.min_length));
        }

        if !password.chars().any(char::is_uppercase) {
            return Err(PolicyViolation::MissingUppercase);
        }

        if !password.chars().any(char::is_lowercase) {
            return Err(PolicyViolation::MissingLowercase);
        }

        if !password.chars().any(char::is_numeric) {
            return Err(PolicyViolation::MissingDigit);
        }

        if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            return Err(PolicyViolation::MissingSpecial);
        }

        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(8)
    }
}
