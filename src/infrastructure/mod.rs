//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - The in-process event bus and connection registry
//! - Database repositories (PostgreSQL)
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod realtime;
pub mod repositories;
