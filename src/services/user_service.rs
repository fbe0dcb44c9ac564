//! 用户管理服务（仅超级用户）

use crate::{
    auth::gateway::Identity,
    error::AppError,
    models::user::User,
    repository::UserStore,
};
use std::sync::Arc;

pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 启用/停用用户；不能停用自己
    pub async fn set_active(
        &self,
        admin: &Identity,
        id: i64,
        active: bool,
    ) -> Result<User, AppError> {
        if !active && admin.id() == id {
            return Err(AppError::validation("Cannot deactivate your own account"));
        }

        let user = self
            .users
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(admin_id = admin.id(), user_id = id, active, "User status changed");
        Ok(user)
    }
}
