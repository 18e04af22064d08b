//! Room membership roles and the membership lookup contract.
//!
//! Maps to the `room_members` table (`room_id`, `user_id`, `role`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::ServiceError;

/// Role a user holds inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Member,
    Admin,
    Owner,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Admin => "admin",
            MemberRole::Owner => "owner",
        }
    }

    /// Parse a stored role; unknown values degrade to `Member`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "owner" => MemberRole::Owner,
            "admin" => MemberRole::Admin,
            _ => MemberRole::Member,
        }
    }
}

/// Membership and existence checks for rooms.
///
/// Consumed by the connection session before a subscription or a message is
/// accepted. Implementations live in the infrastructure layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomLookup: Send + Sync {
    /// Whether `user_id` is a member of `room_id`.
    async fn is_member(&self, room_id: &str, user_id: &str) -> Result<bool, ServiceError>;

    /// Whether the room exists at all.
    async fn exists(&self, room_id: &str) -> Result<bool, ServiceError>;
}
