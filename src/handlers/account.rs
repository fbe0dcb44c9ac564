//! 账户管理 HTTP 处理器

use crate::{
    auth::middleware::CurrentUser,
    error::AppError,
    middleware::AppState,
    models::account::*,
    services::AccountService,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// 列出当前用户的账户
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<AccountQuery>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.account_service.list(&identity, &query).await?;
    Ok(Json(response))
}

/// 创建账户
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.account_service.create(&identity, req).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// 获取账户详情
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.account_service.get(&identity, id).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// 更新账户
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.account_service.update(&identity, id, req).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// 删除账户（软删除）
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.delete(&identity, id).await?;
    Ok(Json(json!({"message": "Account deleted successfully"})))
}

/// 重新启用账户
pub async fn activate_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.account_service.activate(&identity, id).await?;
    Ok(Json(json!({"message": "Account activated successfully"})))
}

/// 账户类型列表
pub async fn account_types() -> impl IntoResponse {
    Json(AccountService::account_types())
}
