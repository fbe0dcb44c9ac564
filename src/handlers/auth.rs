//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::{extract_token, CurrentUser, OptionalUser},
    error::AppError,
    middleware::AppState,
    models::{auth::*, user::*},
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.login(req).await?;
    Ok(Json(tokens))
}

/// 刷新令牌（刷新令牌放在 Authorization: Bearer 头中）
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.refresh(extract_token(&headers)).await?;
    Ok(Json(tokens))
}

/// 登出
///
/// 令牌是无状态的，服务端只做确认，客户端负责丢弃令牌。
pub async fn logout(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    tracing::info!(user_id = identity.id(), "User logged out");
    Json(json!({"message": "Successfully logged out"}))
}

/// 当前用户信息
pub async fn me(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    Json(UserResponse::from(identity.user))
}

/// 更新当前用户资料
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.update_profile(&identity, req).await?;
    Ok(Json(UserResponse::from(user)))
}

/// 修改密码
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.change_password(&identity, req).await?;
    Ok(Json(json!({"message": "Password changed successfully"})))
}

/// 申请密码重置
///
/// 无论邮箱是否注册，响应都相同。
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.auth_service.request_password_reset(req).await?;

    Ok(Json(PasswordResetRequested {
        message: "If the email exists, a password reset link has been sent",
        reset_token: token.filter(|_| state.config.security.expose_reset_token),
    }))
}

/// 使用令牌重置密码
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.reset_password(req).await?;
    Ok(Json(json!({"message": "Password reset successfully"})))
}

/// 校验访问令牌
pub async fn verify_token(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    Json(TokenVerification {
        valid: true,
        user_id: identity.id(),
        email: identity.user.email,
    })
}

#[derive(Serialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

/// 匿名和已登录用户都可访问
pub async fn whoami(OptionalUser(identity): OptionalUser) -> impl IntoResponse {
    let user = identity.map(|i| UserResponse::from(i.user));
    Json(WhoAmIResponse {
        authenticated: user.is_some(),
        user,
    })
}
