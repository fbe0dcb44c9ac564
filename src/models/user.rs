//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User account
///
/// 不实现 Serialize：password_hash 和重置令牌永远不能直接出现在响应中，
/// 对外一律使用 [`UserResponse`]。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,

    // Account state
    pub is_active: bool,
    pub is_superuser: bool,

    // Password reset (token stored as SHA-256 digest)
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,

    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn role(&self) -> Role {
        if self.is_superuser {
            Role::Superuser
        } else {
            Role::Member
        }
    }
}

/// Role attached to an identity at authentication time
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Superuser,
}

/// Things an authenticated identity may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read and modify resources it owns
    ManageOwnResources,
    /// Read and modify resources owned by anyone
    AccessAnyResource,
    /// Look up and (de)activate other users
    AdministerUsers,
}

impl Role {
    pub fn grants(&self, capability: Capability) -> bool {
        match (self, capability) {
            (_, Capability::ManageOwnResources) => true,
            (Role::Superuser, Capability::AccessAnyResource | Capability::AdministerUsers) => true,
            (Role::Member, Capability::AccessAnyResource | Capability::AdministerUsers) => false,
        }
    }
}

/// Lowercase and trim an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: String,
}

/// Row values for a user insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: Option<String>,
}

/// Change password request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Password reset token request
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Password reset with a previously issued token
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// User response (without sensitive data)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub role: Role,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            timezone: user.timezone,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(is_superuser: bool) -> User {
        User {
            id: 7,
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_active: true,
            is_superuser,
            password_reset_token: Some("digest".to_string()),
            password_reset_expires: None,
            timezone: "UTC".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Member.grants(Capability::ManageOwnResources));
        assert!(!Role::Member.grants(Capability::AccessAnyResource));
        assert!(!Role::Member.grants(Capability::AdministerUsers));
        assert!(Role::Superuser.grants(Capability::AccessAnyResource));
        assert!(Role::Superuser.grants(Capability::AdministerUsers));
    }

    #[test]
    fn test_user_response_hides_secrets() {
        let response = UserResponse::from(sample_user(false));
        let json = serde_json::to_value(&response).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_reset_token").is_none());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["role"], "member");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_user(true).full_name(), "Ada Lovelace");
        assert_eq!(sample_user(true).role(), Role::Superuser);
    }
}
