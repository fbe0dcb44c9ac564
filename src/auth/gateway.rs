//! 请求认证网关
//!
//! 每个请求的处理流程：
//! `无凭证 -> 有令牌 -> 校验通过(subject) -> 查找用户 -> Identity`，
//! 任一步失败即拒绝。提供三种强度：必须认证、可选认证、特权认证。

use crate::{
    auth::jwt::{JwtService, TokenType},
    error::{AppError, AuthRejection},
    models::user::{Capability, Role, User},
    repository::UserStore,
};
use std::sync::Arc;

/// 已认证的身份，角色在认证时确定
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub role: Role,
}

impl Identity {
    pub fn new(user: User) -> Self {
        let role = user.role();
        Self { user, role }
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }
}

pub struct AuthGateway {
    jwt: Arc<JwtService>,
    users: Arc<dyn UserStore>,
}

impl AuthGateway {
    pub fn new(jwt: Arc<JwtService>, users: Arc<dyn UserStore>) -> Self {
        Self { jwt, users }
    }

    /// 必须认证：任何拒绝都返回 401
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AppError> {
        let token = token.ok_or(AppError::Unauthorized(AuthRejection::MissingCredential))?;
        let subject = self.jwt.verify(token, TokenType::Access)?;
        self.resolve(subject).await
    }

    /// 可选认证：只把认证拒绝转换为 None，存储错误照常返回
    pub async fn authenticate_optional(
        &self,
        token: Option<&str>,
    ) -> Result<Option<Identity>, AppError> {
        match self.authenticate(token).await {
            Ok(identity) => Ok(Some(identity)),
            Err(AppError::Unauthorized(reason)) => {
                tracing::debug!("Optional authentication yielded anonymous: {:?}", reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 特权认证：认证通过后还需要用户管理能力，否则 403
    pub async fn authenticate_privileged(&self, token: Option<&str>) -> Result<Identity, AppError> {
        let identity = self.authenticate(token).await?;
        if !identity.can(Capability::AdministerUsers) {
            tracing::warn!(user_id = identity.id(), "Privileged access denied");
            return Err(AppError::Forbidden);
        }
        Ok(identity)
    }

    /// 根据令牌主体加载用户；不存在或已停用都会被拒绝
    pub async fn resolve(&self, subject: i64) -> Result<Identity, AppError> {
        let user = self
            .users
            .find_by_id(subject)
            .await?
            .ok_or(AppError::Unauthorized(AuthRejection::UnknownIdentity))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(AuthRejection::InactiveIdentity));
        }

        Ok(Identity::new(user))
    }
}
