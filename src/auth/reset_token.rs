//! Password reset token generation and hashing

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Length of the raw token handed to the user
pub const RESET_TOKEN_LEN: usize = 43;

/// Reset token generator
pub struct ResetToken;

impl ResetToken {
    /// Generate a new random token (alphanumeric, URL safe)
    pub fn generate() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_LEN)
            .map(char::from)
            .collect()
    }

    /// Digest stored in place of the raw token (SHA-256, hex)
    pub fn hash(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token() {
        let token = ResetToken::generate();
        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, ResetToken::generate());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let token = "abc123";
        assert_eq!(ResetToken::hash(token), ResetToken::hash(token));
        assert_eq!(ResetToken::hash(token).len(), 64);
        assert_ne!(ResetToken::hash(token), ResetToken::hash("abc124"));
    }
}
