//! Route Configuration
//!
//! Configures the WebSocket endpoint and the operational HTTP routes.

use axum::{response::IntoResponse, routing::get, Router};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Realtime endpoint
        .route("/ws", get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}
