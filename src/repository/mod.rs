//! Database repository layer
//!
//! Services talk to the stores through [`UserStore`] and [`AccountStore`];
//! PostgreSQL repositories back them in production and [`MemoryStore`]
//! backs them in tests. Every method is a single-record operation.

pub mod account_repo;
pub mod memory;
pub mod user_repo;

pub use account_repo::AccountRepository;
pub use memory::MemoryStore;
pub use user_repo::UserRepository;

use crate::{
    db::HealthStatus,
    error::AppError,
    models::{
        account::{Account, AccountFilter, CreateAccountRequest, UpdateAccountRequest},
        user::{NewUser, UpdateProfileRequest, User},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub const EMAIL_TAKEN: &str = "Email already registered";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// 根据邮箱查找用户（不区分大小写）
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// 根据重置令牌摘要查找用户
    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;

    /// 创建用户；邮箱重复时返回校验错误
    async fn create(&self, new_user: &NewUser) -> Result<User, AppError>;

    /// 更新资料字段（None 表示不修改）
    async fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError>;

    /// 替换密码哈希
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, AppError>;

    /// 记录重置令牌摘要和过期时间
    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// 使用重置令牌：令牌仍匹配且未过期时替换密码并清空令牌
    ///
    /// 返回 false 表示令牌已失效（被使用、过期或不存在）。
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// 更新最后登录时间
    async fn touch_last_login(&self, id: i64) -> Result<(), AppError>;

    /// 启用或停用账户
    async fn set_active(&self, id: i64, active: bool) -> Result<Option<User>, AppError>;

    /// 存储健康检查
    async fn health(&self) -> HealthStatus;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 为指定用户创建账户
    async fn create(&self, owner_id: i64, req: &CreateAccountRequest) -> Result<Account, AppError>;

    /// 根据 ID 查找账户（不做归属过滤，由调用方检查）
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError>;

    /// 查找用户名下同名的有效账户
    async fn find_active_by_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> Result<Option<Account>, AppError>;

    /// 按过滤条件分页列出账户
    async fn list(&self, filter: &AccountFilter) -> Result<Vec<Account>, AppError>;

    /// 按过滤条件统计账户数量（忽略分页）
    async fn count(&self, filter: &AccountFilter) -> Result<i64, AppError>;

    /// 更新账户字段（None 表示不修改）
    async fn update(
        &self,
        id: i64,
        changes: &UpdateAccountRequest,
    ) -> Result<Option<Account>, AppError>;

    /// 软删除（is_active = false）
    async fn deactivate(&self, id: i64) -> Result<bool, AppError>;
}

/// 唯一约束冲突转换为校验错误，其余保持数据库错误
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(message.to_string())
        }
        _ => AppError::Database(e),
    }
}
