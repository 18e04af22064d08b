//! Room Events
//!
//! Immutable notifications fanned out by the event bus. Each variant is tagged
//! on the wire by its `type` field (`message.created`, `room.member_added`, ...).
//! Events are ephemeral: nothing here is persisted or replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{MemberRole, MessageWithUser, Room};
use super::value_objects::{MessageId, RoomId, UserId};

/// Every event kind distributed to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    // Message events
    #[serde(rename = "message.created")]
    MessageCreated(MessageCreatedEvent),
    #[serde(rename = "message.updated")]
    MessageUpdated(MessageUpdatedEvent),
    #[serde(rename = "message.deleted")]
    MessageDeleted(MessageDeletedEvent),

    // Room events
    #[serde(rename = "room.created")]
    RoomCreated(RoomCreatedEvent),
    #[serde(rename = "room.updated")]
    RoomUpdated(RoomUpdatedEvent),
    #[serde(rename = "room.deleted")]
    RoomDeleted(RoomDeletedEvent),

    // Membership events
    #[serde(rename = "room.member_added")]
    MemberAdded(MemberAddedEvent),
    #[serde(rename = "room.member_removed")]
    MemberRemoved(MemberRemovedEvent),
    #[serde(rename = "room.member_role_changed")]
    MemberRoleChanged(MemberRoleChangedEvent),

    // Presence events
    #[serde(rename = "user.typing")]
    UserTyping(UserTypingEvent),
    #[serde(rename = "user.online")]
    UserOnline(UserPresenceEvent),
    #[serde(rename = "user.offline")]
    UserOffline(UserPresenceEvent),
}

impl RoomEvent {
    /// Wire name of the event, as found in its `type` field
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::MessageCreated(_) => "message.created",
            RoomEvent::MessageUpdated(_) => "message.updated",
            RoomEvent::MessageDeleted(_) => "message.deleted",
            RoomEvent::RoomCreated(_) => "room.created",
            RoomEvent::RoomUpdated(_) => "room.updated",
            RoomEvent::RoomDeleted(_) => "room.deleted",
            RoomEvent::MemberAdded(_) => "room.member_added",
            RoomEvent::MemberRemoved(_) => "room.member_removed",
            RoomEvent::MemberRoleChanged(_) => "room.member_role_changed",
            RoomEvent::UserTyping(_) => "user.typing",
            RoomEvent::UserOnline(_) => "user.online",
            RoomEvent::UserOffline(_) => "user.offline",
        }
    }

    /// Room this event is scoped to. `room.created` is a global broadcast and has none.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            RoomEvent::MessageCreated(e) => Some(&e.room_id),
            RoomEvent::MessageUpdated(e) => Some(&e.room_id),
            RoomEvent::MessageDeleted(e) => Some(&e.room_id),
            RoomEvent::RoomCreated(_) => None,
            RoomEvent::RoomUpdated(e) => Some(&e.room_id),
            RoomEvent::RoomDeleted(e) => Some(&e.room_id),
            RoomEvent::MemberAdded(e) => Some(&e.room_id),
            RoomEvent::MemberRemoved(e) => Some(&e.room_id),
            RoomEvent::MemberRoleChanged(e) => Some(&e.room_id),
            RoomEvent::UserTyping(e) => Some(&e.room_id),
            RoomEvent::UserOnline(e) | RoomEvent::UserOffline(e) => Some(&e.room_id),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RoomEvent::MessageCreated(e) => e.timestamp,
            RoomEvent::MessageUpdated(e) => e.timestamp,
            RoomEvent::MessageDeleted(e) => e.timestamp,
            RoomEvent::RoomCreated(e) => e.timestamp,
            RoomEvent::RoomUpdated(e) => e.timestamp,
            RoomEvent::RoomDeleted(e) => e.timestamp,
            RoomEvent::MemberAdded(e) => e.timestamp,
            RoomEvent::MemberRemoved(e) => e.timestamp,
            RoomEvent::MemberRoleChanged(e) => e.timestamp,
            RoomEvent::UserTyping(e) => e.timestamp,
            RoomEvent::UserOnline(e) | RoomEvent::UserOffline(e) => e.timestamp,
        }
    }

    /// The user this event is about: the author, the actor or the affected member.
    ///
    /// Membership events resolve to the member being added, removed or
    /// re-roled rather than to the user who performed the change.
    pub fn actor_id(&self) -> &str {
        match self {
            RoomEvent::MessageCreated(e) => &e.message.user_id,
            RoomEvent::MessageUpdated(e) => &e.user_id,
            RoomEvent::MessageDeleted(e) => &e.user_id,
            RoomEvent::RoomCreated(e) => &e.room.created_by,
            RoomEvent::RoomUpdated(e) => &e.updated_by,
            RoomEvent::RoomDeleted(e) => &e.deleted_by,
            RoomEvent::MemberAdded(e) => &e.user_id,
            RoomEvent::MemberRemoved(e) => &e.user_id,
            RoomEvent::MemberRoleChanged(e) => &e.user_id,
            RoomEvent::UserTyping(e) => &e.user_id,
            RoomEvent::UserOnline(e) | RoomEvent::UserOffline(e) => &e.user_id,
        }
    }

    /// `message.created` for a freshly stored message, stamped now.
    pub fn message_created(message: MessageWithUser) -> Self {
        RoomEvent::MessageCreated(MessageCreatedEvent {
            room_id: message.room_id.clone(),
            timestamp: Utc::now(),
            message,
        })
    }

    /// `user.typing`, stamped now.
    pub fn user_typing(
        room_id: impl Into<RoomId>,
        user_id: impl Into<UserId>,
        username: impl Into<String>,
        is_typing: bool,
    ) -> Self {
        RoomEvent::UserTyping(UserTypingEvent {
            room_id: room_id.into(),
            timestamp: Utc::now(),
            user_id: user_id.into(),
            username: username.into(),
            is_typing,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreatedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub message: MessageWithUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdatedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub message_id: MessageId,
    pub content: String,
    pub user_id: UserId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub message_id: MessageId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedEvent {
    pub timestamp: DateTime<Utc>,
    pub room: Room,
}

/// Fields changed by a room update; absent fields were left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdatedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub updates: RoomUpdates,
    pub updated_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub deleted_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAddedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
    pub role: MemberRole,
    pub added_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemovedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
    pub removed_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRoleChangedEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
    pub old_role: MemberRole,
    pub new_role: MemberRole,
    pub changed_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
    pub is_typing: bool,
}

/// Payload shared by `user.online` and `user.offline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresenceEvent {
    pub room_id: RoomId,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
}
