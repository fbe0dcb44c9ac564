//! Authentication and authorization module

pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod ownership;
pub mod password;
pub mod policy;
pub mod rate_limit;
pub mod reset_token;

pub use gateway::{AuthGateway, Identity};
pub use jwt::{Claims, JwtService, TokenType};
pub use middleware::{extract_token, AdminUser, CurrentUser, OptionalUser};
pub use ownership::{allow, ensure_access, OwnedResource};
pub use password::PasswordHasher;
pub use policy::{PasswordPolicy, PolicyViolation};
pub use rate_limit::RateLimiter;
pub use reset_token::ResetToken;
