//! Error Types
//!
//! Collaborator-facing and protocol-facing error taxonomies.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned by the collaborator services (room, message, user lookups).
///
/// Raw driver errors stop here; the protocol layer only ever sees this type.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category, used for log levels and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Transport,
    Internal,
}

/// Protocol-level error surfaced to a single connection as an `error` frame.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authentication timed out")]
    AuthTimeout,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not a member of room {0}")]
    NotRoomMember(String),

    #[error("Room access denied: {0}")]
    RoomAccessDenied(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Message send failed: {0}")]
    MessageSendFailed(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Stable wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RealtimeError::Authentication(_) => ErrorCode::AuthFailed,
            RealtimeError::AuthTimeout => ErrorCode::AuthTimeout,
            RealtimeError::NotAuthenticated => ErrorCode::NotAuthenticated,
            RealtimeError::NotRoomMember(_) => ErrorCode::NotRoomMember,
            RealtimeError::RoomAccessDenied(_) => ErrorCode::RoomAccessDenied,
            RealtimeError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            RealtimeError::UserNotFound(_) => ErrorCode::UserNotFound,
            RealtimeError::MessageSendFailed(_) => ErrorCode::MessageSendFailed,
            RealtimeError::InvalidJson(_) => ErrorCode::InvalidJson,
            RealtimeError::InvalidMessage(_) => ErrorCode::InvalidMessage,
            RealtimeError::UnknownMessageType(_) => ErrorCode::UnknownMessageType,
            RealtimeError::Validation(_) => ErrorCode::ValidationError,
            RealtimeError::Transport(_) | RealtimeError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RealtimeError::Authentication(_)
            | RealtimeError::AuthTimeout
            | RealtimeError::NotAuthenticated => ErrorKind::Authentication,
            RealtimeError::NotRoomMember(_) | RealtimeError::RoomAccessDenied(_) => {
                ErrorKind::Authorization
            }
            RealtimeError::InvalidJson(_)
            | RealtimeError::InvalidMessage(_)
            | RealtimeError::UnknownMessageType(_)
            | RealtimeError::Validation(_) => ErrorKind::Validation,
            RealtimeError::RoomNotFound(_) | RealtimeError::UserNotFound(_) => ErrorKind::NotFound,
            RealtimeError::Transport(_) => ErrorKind::Transport,
            RealtimeError::MessageSendFailed(_) | RealtimeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable message safe to send to the client.
    ///
    /// Internal details are never included; they are logged by the caller.
    pub fn client_message(&self) -> String {
        match self {
            RealtimeError::Authentication(_) => "Invalid token".into(),
            RealtimeError::AuthTimeout => "Authentication timed out".into(),
            RealtimeError::NotAuthenticated => "Please authenticate first".into(),
            RealtimeError::NotRoomMember(_) => "You are not a member of this room".into(),
            RealtimeError::RoomAccessDenied(_) => "Cannot access this room".into(),
            RealtimeError::RoomNotFound(_) => "Room not found".into(),
            RealtimeError::UserNotFound(_) => "User not found".into(),
            RealtimeError::MessageSendFailed(_) => "Failed to send message".into(),
            RealtimeError::InvalidJson(_) => "Invalid JSON format".into(),
            RealtimeError::InvalidMessage(_) => "Invalid message format".into(),
            RealtimeError::UnknownMessageType(kind) => format!("Unknown message type: {}", kind),
            RealtimeError::Validation(msg) => msg.clone(),
            RealtimeError::Transport(_) | RealtimeError::Internal(_) => {
                "Internal server error".into()
            }
        }
    }
}

/// Stable error codes carried by `error` frames.
///
/// Codes this build does not know are preserved in `Other` so that clients
/// never fail to decode an error frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthFailed,
    AuthTimeout,
    UserNotFound,
    NotAuthenticated,
    NotRoomMember,
    RoomNotFound,
    RoomAccessDenied,
    MessageSendFailed,
    InvalidJson,
    InvalidMessage,
    UnknownMessageType,
    ValidationError,
    InternalError,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::AuthTimeout => "AUTH_TIMEOUT",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorCode::NotRoomMember => "NOT_ROOM_MEMBER",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomAccessDenied => "ROOM_ACCESS_DENIED",
            ErrorCode::MessageSendFailed => "MESSAGE_SEND_FAILED",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "AUTH_FAILED" => ErrorCode::AuthFailed,
            "AUTH_TIMEOUT" => ErrorCode::AuthTimeout,
            "USER_NOT_FOUND" => ErrorCode::UserNotFound,
            "NOT_AUTHENTICATED" => ErrorCode::NotAuthenticated,
            "NOT_ROOM_MEMBER" => ErrorCode::NotRoomMember,
            "ROOM_NOT_FOUND" => ErrorCode::RoomNotFound,
            "ROOM_ACCESS_DENIED" => ErrorCode::RoomAccessDenied,
            "MESSAGE_SEND_FAILED" => ErrorCode::MessageSendFailed,
            "INVALID_JSON" => ErrorCode::InvalidJson,
            "INVALID_MESSAGE" => ErrorCode::InvalidMessage,
            "UNKNOWN_MESSAGE_TYPE" => ErrorCode::UnknownMessageType,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "INTERNAL_ERROR" => ErrorCode::InternalError,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// Whether the server refused the credentials of this connection.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            ErrorCode::AuthFailed | ErrorCode::AuthTimeout | ErrorCode::UserNotFound
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ErrorCode::from_code(&code))
    }
}
