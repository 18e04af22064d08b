//! Health Check API Tests

use axum::http::StatusCode;
use axum_test::TestServer;
use hive_realtime::presentation::http::routes::create_router;
use serde_json::Value;

use crate::common::{app_state, oneshot, Directory};

fn server() -> TestServer {
    let state = app_state(&Directory::seeded());
    TestServer::new(create_router(state)).expect("failed to start test server")
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let response = server().get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness_probe() {
    let response = server().get("/health/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_realtime_load_without_database() {
    let response = server().get("/health/ready").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["checks"].get("database").is_none());

    let realtime = &body["checks"]["realtime"];
    assert_eq!(realtime["status"], "healthy");
    assert_eq!(realtime["active_connections"], 0);
    assert_eq!(realtime["authenticated_connections"], 0);
    assert_eq!(realtime["bus_subscribers"], 0);
    assert_eq!(realtime["bus_capacity"], 1000);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() {
    let response = server().get("/metrics").await;

    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let response = server().get("/ws").await;

    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use hive_realtime::config::CorsSettings;
    use hive_realtime::presentation::middleware::cors::create_cors_layer;

    let state = app_state(&Directory::seeded());
    let router = create_router(state).layer(create_cors_layer(&CorsSettings {
        allowed_origins: vec!["http://localhost:3000".into()],
    }));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = oneshot(router, request).await;

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}
