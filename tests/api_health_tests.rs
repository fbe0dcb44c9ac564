//! 健康检查与中间件集成测试

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
};
use std::net::SocketAddr;

mod common;
use common::{send_request, TestApp};

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["status"], "ok");
    assert!(response.json["version"].is_string());
    assert!(response.json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/ready", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["ready"], true);
    assert_eq!(response.json["checks"][0]["name"], "database");
    assert_eq!(response.json["checks"][0]["status"], "healthy");
}

#[tokio::test]
async fn test_security_and_tracking_headers() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(response.headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    assert!(response.headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(response.headers.contains_key("x-request-id"));
    assert!(response.headers.contains_key("x-trace-id"));
}

#[tokio::test]
async fn test_trace_id_is_propagated() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .header("x-trace-id", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = send_request(app.router(), request).await;

    assert_eq!(response.headers["x-trace-id"], "trace-abc");
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut config = common::create_test_config();
    config.security.rate_limit_per_minute = 3;
    let app = TestApp::with_config(config);

    let request_from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/accounts/types")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..3 {
        let response = send_request(app.router(), request_from("203.0.113.5")).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let limited = send_request(app.router(), request_from("203.0.113.5")).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json["error"]["code"], 429);

    // 其他客户端不受影响
    let other = send_request(app.router(), request_from("198.51.100.7")).await;
    assert_eq!(other.status, StatusCode::OK);

    // 健康检查不限流
    let health = send_request(
        app.router(),
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", "203.0.113.5")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_header_ignored_without_trusted_proxy() {
    let mut config = common::create_test_config();
    config.security.rate_limit_per_minute = 3;
    config.security.trust_proxy = false;
    let app = TestApp::with_config(config);
    let peer: SocketAddr = "192.0.2.10:51000".parse().unwrap();

    let mut statuses = Vec::new();
    for i in 0..5 {
        let mut request = Request::builder()
            .uri("/api/v1/accounts/types")
            .header("x-forwarded-for", format!("10.0.0.{}", i))
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        statuses.push(send_request(app.router(), request).await.status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/auth/login")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = send_request(app.router(), request).await;

    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/api/v1/nope", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
