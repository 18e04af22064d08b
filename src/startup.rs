//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{JwtTokenVerifier, RealtimeServices};
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::realtime::{ConnectionRegistry, EventBus};
use crate::infrastructure::repositories::{
    PgMessageRepository, PgRoomRepository, PgUserRepository,
};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub bus: EventBus,
    pub services: RealtimeServices,
    pub connections: Arc<ConnectionRegistry>,
    /// Pool behind the collaborators, when they are database backed
    pub db: Option<PgPool>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings, with PostgreSQL collaborators
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database).context("invalid database settings")?;
        tracing::info!("Database connection pool created");

        let services = RealtimeServices::new(
            Arc::new(JwtTokenVerifier::from_settings(&settings.jwt)),
            Arc::new(PgRoomRepository::new(db.clone())),
            Arc::new(PgMessageRepository::new(db.clone())),
            Arc::new(PgUserRepository::new(db.clone())),
        );

        Self::build_with_services(settings, services, Some(db)).await
    }

    /// Build the application around caller-supplied collaborators
    pub async fn build_with_services(
        settings: Settings,
        services: RealtimeServices,
        db: Option<PgPool>,
    ) -> Result<Self> {
        health::init_server_start();

        let bus = EventBus::new(settings.realtime.bus_capacity);
        tracing::info!(capacity = bus.capacity(), "Event bus created");

        let state = AppState {
            bus,
            services,
            connections: Arc::new(ConnectionRegistry::new()),
            db,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state.clone())
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let addr = settings
            .server
            .socket_addr()
            .with_context(|| format!("invalid server address {}", settings.server_addr()))?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Shared state, for producers that publish onto the event bus
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn event_bus(&self) -> EventBus {
        self.state.bus.clone()
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
