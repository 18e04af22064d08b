//! Connection Registry
//!
//! Read-mostly directory of the live WebSocket connections, used by health
//! reporting and metrics. Sessions never read each other's entries.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::value_objects::UserId;
use crate::infrastructure::metrics;

/// What the registry knows about one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_id: Uuid,
    pub user_id: Option<UserId>,
    pub subscribed_rooms: usize,
    pub connected_at: DateTime<Utc>,
}

/// Live connections by connection id
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection
    pub fn register(&self, connection_id: Uuid) {
        self.connections.insert(
            connection_id,
            ConnectionInfo {
                connection_id,
                user_id: None,
                subscribed_rooms: 0,
                connected_at: Utc::now(),
            },
        );

        tracing::debug!(connection_id = %connection_id, "Connection registered");
        self.refresh_metrics();
    }

    /// Record the connection's current user and subscription count
    pub fn update(&self, connection_id: Uuid, user_id: Option<&str>, subscribed_rooms: usize) {
        if let Some(mut info) = self.connections.get_mut(&connection_id) {
            if info.user_id.as_deref() == user_id && info.subscribed_rooms == subscribed_rooms {
                return;
            }
            info.user_id = user_id.map(str::to_owned);
            info.subscribed_rooms = subscribed_rooms;
        } else {
            return;
        }

        self.refresh_metrics();
    }

    /// Remove a closed connection
    pub fn unregister(&self, connection_id: Uuid) {
        if let Some((_, info)) = self.connections.remove(&connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                user_id = ?info.user_id,
                "Connection unregistered"
            );
            self.refresh_metrics();
        }
    }

    pub fn get(&self, connection_id: Uuid) -> Option<ConnectionInfo> {
        self.connections.get(&connection_id).map(|info| info.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn authenticated_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.user_id.is_some())
            .count()
    }

    /// Number of live connections authenticated as `user_id`
    pub fn user_connection_count(&self, user_id: &str) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.user_id.as_deref() == Some(user_id))
            .count()
    }

    fn refresh_metrics(&self) {
        metrics::set_websocket_connections(self.connection_count(), self.authenticated_count());
    }
}
