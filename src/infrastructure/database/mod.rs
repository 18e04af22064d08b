//! Database Module
//!
//! PostgreSQL connection pool used by the collaborator repositories.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseSettings;

/// Create a PostgreSQL connection pool
///
/// The pool connects lazily so the realtime server can accept sockets while
/// the database is still coming up; `/health/ready` reports reachability.
pub fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect_lazy(&settings.url)
}
