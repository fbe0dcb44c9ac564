//! Authentication-related models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

/// Token pair returned by login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// seconds until the access token expires
    pub expires_in: u64,
}

/// Token verification response
#[derive(Debug, Serialize)]
pub struct TokenVerification {
    pub valid: bool,
    pub user_id: i64,
    pub email: String,
}

/// Response of the password reset request endpoint
///
/// The message is identical whether or not the email is registered.
#[derive(Debug, Serialize)]
pub struct PasswordResetRequested {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}
