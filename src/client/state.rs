//! Client-side mirror of the server connection state.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::value_objects::{RoomId, UserId};

/// Lifecycle of the client's logical session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Authenticated,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Authenticating => "authenticating",
            ConnectionStatus::Authenticated => "authenticated",
            ConnectionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the client remembers across reconnects.
///
/// `subscribed_rooms` is the set replayed after every successful
/// authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConnectionState {
    pub status: ConnectionStatus,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub subscribed_rooms: HashSet<RoomId>,
}

impl ClientConnectionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == ConnectionStatus::Authenticated
    }

    pub(crate) fn authenticated(&mut self, user_id: UserId, username: String) {
        self.status = ConnectionStatus::Authenticated;
        self.user_id = Some(user_id);
        self.username = Some(username);
    }

    /// Drop the identity learned from the server, keeping subscriptions.
    pub(crate) fn connection_lost(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.user_id = None;
        self.username = None;
    }
}
