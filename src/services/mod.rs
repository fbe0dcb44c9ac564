//! Business logic services layer

pub mod account_service;
pub mod auth_service;
pub mod user_service;

pub use account_service::AccountService;
pub use auth_service::AuthService;
pub use user_service::UserService;
