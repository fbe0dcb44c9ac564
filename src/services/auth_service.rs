//! 认证服务：注册、登录、令牌刷新、密码修改与重置

use crate::{
    auth::{
        gateway::{AuthGateway, Identity},
        jwt::{JwtService, TokenType},
        password::PasswordHasher,
        policy::PasswordPolicy,
        reset_token::ResetToken,
    },
    config::AppConfig,
    error::{AppError, AuthRejection},
    models::{auth::*, user::*},
    repository::{UserStore, EMAIL_TAKEN},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use validator::Validate;

/// 重置令牌无效、过期或已使用时的统一提示
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: Arc<JwtService>,
    gateway: Arc<AuthGateway>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    reset_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_service: Arc<JwtService>,
        gateway: Arc<AuthGateway>,
        config: &AppConfig,
    ) -> Self {
        Self {
            users,
            jwt_service,
            gateway,
            hasher: PasswordHasher::new(),
            policy: PasswordPolicy::from_config(config),
            reset_token_ttl: Duration::seconds(config.security.password_reset_exp_secs as i64),
        }
    }

    /// 用户注册
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        req.validate()?;

        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::validation(EMAIL_TAKEN));
        }

        self.policy.validate(&req.password)?;

        let password_hash = self.hasher.hash_blocking(req.password).await?;
        let user = self
            .users
            .create(&NewUser {
                email: req.email,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// 用户登录
    ///
    /// 邮箱不存在与密码错误返回同一个错误。
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, AppError> {
        req.validate()?;

        let bad_credentials = AppError::Unauthorized(AuthRejection::BadCredentials);

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            tracing::warn!("Login failed: unknown email");
            return Err(bad_credentials);
        };

        let valid = self
            .hasher
            .verify_blocking(req.password, user.password_hash.clone())
            .await?;
        if !valid {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(bad_credentials);
        }

        // 检查账户状态
        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login failed: inactive user");
            return Err(AppError::Unauthorized(AuthRejection::InactiveIdentity));
        }

        self.users.touch_last_login(user.id).await?;
        let tokens = self.jwt_service.issue_pair(user.id)?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(tokens)
    }

    /// 刷新令牌：验证刷新令牌后签发新的令牌对（旧刷新令牌在过期前仍然有效）
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenResponse, AppError> {
        let token = refresh_token.ok_or(AppError::Unauthorized(AuthRejection::MissingCredential))?;
        let subject = self.jwt_service.verify(token, TokenType::Refresh)?;
        let identity = self.gateway.resolve(subject).await?;

        tracing::debug!(user_id = identity.id(), "Token refreshed");
        self.jwt_service.issue_pair(identity.id())
    }

    /// 更新个人资料
    pub async fn update_profile(
        &self,
        identity: &Identity,
        req: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        req.validate()?;

        if let Some(email) = &req.email {
            if let Some(existing) = self.users.find_by_email(email).await? {
                if existing.id != identity.id() {
                    return Err(AppError::validation(EMAIL_TAKEN));
                }
            }
        }

        self.users
            .update_profile(identity.id(), &req)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 修改密码（需要当前密码）
    pub async fn change_password(
        &self,
        identity: &Identity,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let valid = self
            .hasher
            .verify_blocking(req.current_password, identity.user.password_hash.clone())
            .await?;
        if !valid {
            return Err(AppError::validation("Current password is incorrect"));
        }

        self.policy.validate(&req.new_password)?;

        let password_hash = self.hasher.hash_blocking(req.new_password).await?;
        if !self.users.update_password(identity.id(), &password_hash).await? {
            return Err(AppError::not_found("User"));
        }

        tracing::info!(user_id = identity.id(), "Password changed");
        Ok(())
    }

    /// 申请密码重置
    ///
    /// 返回原始令牌（邮箱未注册或用户已停用时为 None）；调用方不得据此
    /// 改变对外响应。
    pub async fn request_password_reset(
        &self,
        req: PasswordResetRequest,
    ) -> Result<Option<String>, AppError> {
        req.validate()?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };
        if !user.is_active {
            tracing::debug!(user_id = user.id, "Password reset requested for inactive user");
            return Ok(None);
        }

        let token = ResetToken::generate();
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.users
            .set_reset_token(user.id, &ResetToken::hash(&token), expires_at)
            .await?;

        tracing::info!(user_id = user.id, %expires_at, "Password reset requested");
        Ok(Some(token))
    }

    /// 使用重置令牌设置新密码；令牌只能成功使用一次
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        let token_hash = ResetToken::hash(req.token.trim());
        let now = Utc::now();

        let user = self
            .users
            .find_by_reset_token(&token_hash)
            .await?
            .filter(|u| u.password_reset_expires.is_some_and(|exp| exp > now))
            .ok_or_else(|| AppError::validation(INVALID_RESET_TOKEN))?;

        // 新密码不合规时令牌保持可用
        self.policy.validate(&req.new_password)?;

        let password_hash = self.hasher.hash_blocking(req.new_password).await?;
        if !self
            .users
            .consume_reset_token(&token_hash, &password_hash, now)
            .await?
        {
            return Err(AppError::validation(INVALID_RESET_TOKEN));
        }

        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(())
    }
}
