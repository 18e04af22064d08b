//! Telemetry and Observability
//!
//! Structured logging setup. `LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,hive_realtime=debug,sqlx=warn,tower_http=debug";

/// Initialize tracing subscriber
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
    });
    let fmt_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(fmt_layer)
        .try_init();

    if result.is_ok() {
        tracing::info!(json, "Tracing initialized");
    }
}
