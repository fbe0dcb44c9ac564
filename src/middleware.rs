//! HTTP 中间件
//! 请求追踪、安全响应头、速率限制

use crate::{
    auth::{gateway::AuthGateway, jwt::JwtService, rate_limit::RateLimiter},
    config::AppConfig,
    error::AppError,
    repository::{AccountStore, UserStore},
    services::{AccountService, AuthService, UserService},
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 进程内只构建一次，handler 和提取器通过 `Arc<AppState>` 共享。
pub struct AppState {
    pub config: AppConfig,
    pub users: Arc<dyn UserStore>,
    pub jwt_service: Arc<JwtService>,
    pub gateway: Arc<AuthGateway>,
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub user_service: Arc<UserService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    /// 根据配置和存储实现组装所有服务
    pub fn build(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let gateway = Arc::new(AuthGateway::new(jwt_service.clone(), users.clone()));
        let auth_service = Arc::new(AuthService::new(
            users.clone(),
            jwt_service.clone(),
            gateway.clone(),
            &config,
        ));

        Ok(Self {
            account_service: Arc::new(AccountService::new(accounts)),
            user_service: Arc::new(UserService::new(users.clone())),
            rate_limiter: Arc::new(RateLimiter::new()),
            started_at: Instant::now(),
            config,
            users,
            jwt_service,
            gateway,
            auth_service,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.config.security.rate_limit_window_secs)
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            headers.insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 安全响应头
const SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
    (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// 安全响应头中间件
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

/// 速率限制中间件（基于内存滑动窗口，按客户端 IP）
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let connect_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = get_client_ip(req.headers(), connect_addr, state.config.security.trust_proxy);

    let allowed = state.rate_limiter.is_allowed(
        &client_ip,
        state.config.security.rate_limit_per_minute,
        state.rate_limit_window(),
    );

    if !allowed {
        tracing::warn!(client_ip = %client_ip, "Rate limit exceeded");
        metrics::counter!("rate_limited_requests_total").increment(1);
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(req).await)
}

/// 获取客户端 IP 地址
///
/// 信任代理时依次使用 X-Forwarded-For 的第一个地址和 X-Real-IP，
/// 否则使用连接地址。
pub fn get_client_ip(
    headers: &HeaderMap,
    connect_addr: Option<SocketAddr>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    connect_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
