//! Room entity.
//!
//! Maps to the `rooms` table:
//! - id, name, type ('channel' | 'dm'), description (nullable)
//! - created_by, created_at, updated_at

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{RoomId, UserId};

/// Kind of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Channel,
    Dm,
}

/// A chat room as carried by `room.created` events.
///
/// Field names follow the stored record, so they stay snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
