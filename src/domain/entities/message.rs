//! Message entity and the message store contract.
//!
//! Maps to the `messages` table:
//! - id, room_id, user_id, content
//! - created_at, updated_at (deleted_at is never exposed)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserProfile;
use crate::domain::value_objects::{MessageId, RoomId, UserId};
use crate::shared::error::ServiceError;

/// Maximum message content length in UTF-16 code units.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// A stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message joined with its author, the payload of `message.created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithUser {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub username: String,
    pub user_email: Option<String>,
    pub is_edited: bool,
}

impl MessageWithUser {
    /// Attach author details to a freshly created message.
    pub fn new(message: Message, author: &UserProfile) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            user_id: message.user_id,
            content: message.content,
            created_at: message.created_at,
            updated_at: message.updated_at,
            username: author.username.clone(),
            user_email: author.email.clone(),
            is_edited: false,
        }
    }
}

/// Message persistence as seen by the realtime core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message authored by `user_id` in `room_id`.
    async fn create(
        &self,
        user_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<Message, ServiceError>;
}
