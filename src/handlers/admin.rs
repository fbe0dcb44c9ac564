//! 用户管理处理器（需要超级用户）

use crate::{
    auth::middleware::AdminUser, error::AppError, middleware::AppState, models::user::UserResponse,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 查看任意用户
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// 停用用户
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.set_active(&admin, id, false).await?;
    Ok(Json(UserResponse::from(user)))
}

/// 启用用户
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.set_active(&admin, id, true).await?;
    Ok(Json(UserResponse::from(user)))
}
