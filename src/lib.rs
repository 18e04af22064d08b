//! # Hive Realtime Library
//!
//! Real-time event distribution for the chat backend:
//! - An in-process event bus fanning domain events out to subscribers
//! - A WebSocket endpoint with a per-connection auth/subscription state machine
//! - PostgreSQL-backed room, message and user collaborators
//! - A reconnecting client that re-authenticates and resubscribes on its own
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Events, entities, collaborator traits, subscription filters
//! - **Application Layer**: Token verification
//! - **Infrastructure Layer**: Event bus, connection registry, database, metrics
//! - **Presentation Layer**: HTTP routes and the WebSocket endpoint
//! - **Client**: Resilient consumer-side session
//!
//! ## Module Structure
//!
//! ```text
//! hive_realtime/
//! +-- config/         Configuration management
//! +-- domain/         Events, entities, traits, filters
//! +-- application/    Token verification
//! +-- infrastructure/ Event bus, registry, repositories, metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- client/         Reconnecting client session
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Consumer-side client
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
