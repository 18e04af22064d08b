//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Event bus and WebSocket connection settings
    pub realtime: RealtimeSettings,

    /// Settings for the reconnecting client library
    pub client: ClientSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Shared HS256 secret used by the token issuer
    pub secret: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Event bus and WebSocket connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// Capacity of the broadcast channel behind the event bus (default: 1000).
    /// A subscriber that falls further behind loses the oldest events.
    pub bus_capacity: usize,

    /// Per-connection outbound frame queue (default: 256)
    pub outbound_queue_capacity: usize,

    /// Seconds a connection may stay unauthenticated before it is closed (default: 30)
    pub auth_timeout_secs: u64,

    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 64KB)
    pub max_frame_size: usize,
}

/// Reconnecting client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// WebSocket endpoint, e.g. `ws://localhost:3002/ws`
    pub url: String,

    /// Health ping interval while authenticated, in milliseconds (default: 30000)
    pub ping_interval_ms: u64,

    /// First reconnect delay in milliseconds (default: 1000)
    pub backoff_base_ms: u64,

    /// Reconnect delay ceiling in milliseconds (default: 10000)
    pub backoff_max_ms: u64,

    /// Capacity of the inbound event queue handed to the application (default: 1024)
    pub event_queue_capacity: usize,

    /// Capacity of the outbound command queue (default: 256)
    pub command_queue_capacity: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Smallest frame and message limit that still fits a `message.send` whose
/// 4000 UTF-16 units are all written as `\uXXXX` escapes.
pub const MIN_FRAME_SIZE: usize = 32 * 1024;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3002)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("realtime.bus_capacity", 1000_i64)?
            .set_default("realtime.outbound_queue_capacity", 256_i64)?
            .set_default("realtime.auth_timeout_secs", 30_i64)?
            .set_default("realtime.max_message_size", 65536_i64)? // 64KB
            .set_default("realtime.max_frame_size", 65536_i64)? // 64KB
            .set_default("client.url", "ws://localhost:3002/ws")?
            .set_default("client.ping_interval_ms", 30000_i64)?
            .set_default("client.backoff_base_ms", 1000_i64)?
            .set_default("client.backoff_max_ms", 10000_i64)?
            .set_default("client.event_queue_capacity", 1024_i64)?
            .set_default("client.command_queue_capacity", 256_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__REALTIME__BUS_CAPACITY=2000 -> realtime.bus_capacity = 2000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Check invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.realtime.bus_capacity == 0 || self.realtime.outbound_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "realtime queue capacities must be greater than zero".into(),
            ));
        }
        if self.realtime.max_frame_size < MIN_FRAME_SIZE
            || self.realtime.max_message_size < MIN_FRAME_SIZE
        {
            return Err(ConfigError::Message(format!(
                "realtime frame and message limits must be at least {} bytes (frame: {}, message: {})",
                MIN_FRAME_SIZE, self.realtime.max_frame_size, self.realtime.max_message_size
            )));
        }
        if self.client.backoff_base_ms == 0 || self.client.backoff_base_ms > self.client.backoff_max_ms {
            return Err(ConfigError::Message(format!(
                "client backoff base ({}ms) must be non-zero and not exceed the ceiling ({}ms)",
                self.client.backoff_base_ms, self.client.backoff_max_ms
            )));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RealtimeSettings {
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            bus_capacity: 1000,
            outbound_queue_capacity: 256,
            auth_timeout_secs: 30,
            max_message_size: 65536,
            max_frame_size: 65536,
        }
    }
}

impl ClientSettings {
    /// Settings for a client talking to `url`, with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3002/ws".into(),
            ping_interval_ms: 30000,
            backoff_base_ms: 1000,
            backoff_max_ms: 10000,
            event_queue_capacity: 1024,
            command_queue_capacity: 256,
        }
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
