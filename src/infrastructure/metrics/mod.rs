//! Prometheus Metrics Module
//!
//! Provides realtime metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauges by state
//! - Events published to the bus by event type
//! - Events delivered to sockets, and events skipped by lagging subscribers
//! - Inbound frames rejected with an error frame, by error code

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "hive";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace(NAMESPACE),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Events published to the bus, by event type
pub static EVENTS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "realtime_events_published_total",
            "Total number of events published to the event bus",
        )
        .namespace(NAMESPACE),
        &["event_type"],
    )
    .expect("Failed to create EVENTS_PUBLISHED_TOTAL metric")
});

/// Events written to a client socket
pub static EVENTS_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "realtime_events_delivered_total",
            "Total number of events delivered to WebSocket clients",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create EVENTS_DELIVERED_TOTAL metric")
});

/// Events a slow subscriber never saw
pub static EVENTS_LAGGED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "realtime_events_lagged_total",
            "Total number of events skipped by lagging subscribers",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create EVENTS_LAGGED_TOTAL metric")
});

/// Inbound frames answered with an error frame
pub static FRAMES_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "websocket_frames_rejected_total",
            "Total number of inbound frames rejected with an error",
        )
        .namespace(NAMESPACE),
        &["code"],
    )
    .expect("Failed to create FRAMES_REJECTED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_PUBLISHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_PUBLISHED_TOTAL");
    registry
        .register(Box::new(EVENTS_DELIVERED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DELIVERED_TOTAL");
    registry
        .register(Box::new(EVENTS_LAGGED_TOTAL.clone()))
        .expect("Failed to register EVENTS_LAGGED_TOTAL");
    registry
        .register(Box::new(FRAMES_REJECTED_TOTAL.clone()))
        .expect("Failed to register FRAMES_REJECTED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_event_published(event_type: &str) {
    EVENTS_PUBLISHED_TOTAL.with_label_values(&[event_type]).inc();
}

pub fn record_event_delivered() {
    EVENTS_DELIVERED_TOTAL.inc();
}

pub fn record_events_lagged(skipped: u64) {
    EVENTS_LAGGED_TOTAL.inc_by(skipped);
}

pub fn record_frame_rejected(code: &str) {
    FRAMES_REJECTED_TOTAL.with_label_values(&[code]).inc();
}

/// Helper to update WebSocket connection count
pub fn set_websocket_connections(connected: usize, authenticated: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .set(connected as f64);
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["authenticated"])
        .set(authenticated as f64);
}
