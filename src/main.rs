//! # Hive Realtime
//!
//! WebSocket server distributing chat events to subscribed clients.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use hive_realtime::config::Settings;
use hive_realtime::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    hive_realtime::telemetry::init_tracing();

    info!("Starting realtime server...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        bus_capacity = settings.realtime.bus_capacity,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
