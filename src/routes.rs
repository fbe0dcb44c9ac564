//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::{config::AppConfig, handlers, middleware::AppState};

/// 请求体大小上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查，不限流）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/me",
            get(handlers::auth::me).put(handlers::auth::update_me),
        )
        .route("/auth/change-password", post(handlers::auth::change_password))
        .route(
            "/auth/request-password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/auth/token/verify", get(handlers::auth::verify_token))
        .route("/auth/whoami", get(handlers::auth::whoami));

    // 账户
    let account_routes = Router::new()
        .route(
            "/accounts",
            get(handlers::account::list_accounts).post(handlers::account::create_account),
        )
        .route("/accounts/types", get(handlers::account::account_types))
        .route(
            "/accounts/{id}",
            get(handlers::account::get_account)
                .put(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route(
            "/accounts/{id}/activate",
            patch(handlers::account::activate_account),
        );

    // 用户管理（超级用户）
    let admin_routes = Router::new()
        .route("/admin/users/{id}", get(handlers::admin::get_user))
        .route(
            "/admin/users/{id}/deactivate",
            post(handlers::admin::deactivate_user),
        )
        .route(
            "/admin/users/{id}/activate",
            post(handlers::admin::activate_user),
        );

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(account_routes)
        .merge(admin_routes)
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(from_fn(crate::middleware::security_headers_middleware))
        .layer(from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}

/// CORS：只允许配置中的来源
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
