//! WebSocket Message Types
//!
//! JSON frames exchanged on `/ws`. Every frame is an object discriminated by
//! its `type` field.

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::entities::MAX_MESSAGE_LENGTH;
use crate::domain::events::RoomEvent;
use crate::domain::value_objects::{RoomId, UserId};
use crate::shared::error::{ErrorCode, RealtimeError};
use crate::shared::validation::validate;

/// Frame types a client may send.
pub const CLIENT_MESSAGE_TYPES: [&str; 6] = [
    "auth",
    "subscribe",
    "unsubscribe",
    "message.send",
    "typing",
    "ping",
];

/// Client → server frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth { token: String },
    #[serde(rename = "subscribe")]
    Subscribe(RoomPayload),
    #[serde(rename = "unsubscribe")]
    Unsubscribe(RoomPayload),
    #[serde(rename = "message.send")]
    SendMessage(SendMessagePayload),
    #[serde(rename = "typing")]
    Typing(TypingPayload),
    #[serde(rename = "ping")]
    Ping,
}

/// `subscribe` / `unsubscribe` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    #[validate(length(min = 1, message = "Room id is required"))]
    pub room_id: RoomId,
}

/// `message.send` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[validate(length(min = 1, message = "Room id is required"))]
    pub room_id: RoomId,
    #[validate(custom(function = "validate_content_length"))]
    pub content: String,
}

/// Content length is measured in UTF-16 code units, the way browsers count it.
fn validate_content_length(content: &str) -> Result<(), ValidationError> {
    let units = content.encode_utf16().count();
    if (1..=MAX_MESSAGE_LENGTH).contains(&units) {
        return Ok(());
    }
    Err(ValidationError::new("length").with_message(Cow::Owned(format!(
        "Message content must be between 1 and {} characters",
        MAX_MESSAGE_LENGTH
    ))))
}

/// `typing` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[validate(length(min = 1, message = "Room id is required"))]
    pub room_id: RoomId,
    pub is_typing: bool,
}

impl ClientMessage {
    pub fn auth(token: impl Into<String>) -> Self {
        ClientMessage::Auth {
            token: token.into(),
        }
    }

    pub fn subscribe(room_id: impl Into<RoomId>) -> Self {
        ClientMessage::Subscribe(RoomPayload {
            room_id: room_id.into(),
        })
    }

    pub fn unsubscribe(room_id: impl Into<RoomId>) -> Self {
        ClientMessage::Unsubscribe(RoomPayload {
            room_id: room_id.into(),
        })
    }

    pub fn send_message(room_id: impl Into<RoomId>, content: impl Into<String>) -> Self {
        ClientMessage::SendMessage(SendMessagePayload {
            room_id: room_id.into(),
            content: content.into(),
        })
    }

    pub fn typing(room_id: impl Into<RoomId>, is_typing: bool) -> Self {
        ClientMessage::Typing(TypingPayload {
            room_id: room_id.into(),
            is_typing,
        })
    }

    /// Wire name of this frame's `type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Auth { .. } => "auth",
            ClientMessage::Subscribe(_) => "subscribe",
            ClientMessage::Unsubscribe(_) => "unsubscribe",
            ClientMessage::SendMessage(_) => "message.send",
            ClientMessage::Typing(_) => "typing",
            ClientMessage::Ping => "ping",
        }
    }

    /// Field-level rules that serde alone cannot express.
    pub fn validate(&self) -> Result<(), RealtimeError> {
        match self {
            ClientMessage::Subscribe(payload) | ClientMessage::Unsubscribe(payload) => {
                validate(payload)
            }
            ClientMessage::SendMessage(payload) => validate(payload),
            ClientMessage::Typing(payload) => validate(payload),
            ClientMessage::Auth { .. } | ClientMessage::Ping => Ok(()),
        }
    }
}

/// Decode and validate one inbound text frame.
///
/// Failures map to `INVALID_JSON` (not JSON), `INVALID_MESSAGE` (missing
/// `type` or wrong shape), `UNKNOWN_MESSAGE_TYPE` and `VALIDATION_ERROR`.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, RealtimeError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| RealtimeError::InvalidJson(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| RealtimeError::InvalidMessage("missing type".into()))?;

    if !CLIENT_MESSAGE_TYPES.contains(&kind) {
        return Err(RealtimeError::UnknownMessageType(kind.to_string()));
    }

    let message: ClientMessage =
        serde_json::from_value(value).map_err(|e| RealtimeError::InvalidMessage(e.to_string()))?;
    message.validate()?;

    Ok(message)
}

/// Server → client frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "authenticated", rename_all = "camelCase")]
    Authenticated { user_id: UserId, username: String },
    #[serde(rename = "error")]
    Error { code: ErrorCode, message: String },
    #[serde(rename = "event")]
    Event { event: RoomEvent },
    #[serde(rename = "subscribed", rename_all = "camelCase")]
    Subscribed { room_id: RoomId },
    #[serde(rename = "unsubscribed", rename_all = "camelCase")]
    Unsubscribed { room_id: RoomId },
    #[serde(rename = "pong")]
    Pong,
}

impl ServerMessage {
    /// Error frame for a rejected command.
    pub fn from_error(error: &RealtimeError) -> Self {
        ServerMessage::Error {
            code: error.code(),
            message: error.client_message(),
        }
    }
}

/// `{type:"event", event}` over a shared event, serialized without cloning it.
#[derive(Serialize)]
#[serde(tag = "type", rename = "event")]
struct EventFrame<'a> {
    event: &'a RoomEvent,
}

/// A frame queued for the socket writer.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Message(ServerMessage),
    Event(Arc<RoomEvent>),
}

impl OutboundFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            OutboundFrame::Message(message) => serde_json::to_string(message),
            OutboundFrame::Event(event) => serde_json::to_string(&EventFrame { event }),
        }
    }
}

impl From<ServerMessage> for OutboundFrame {
    fn from(message: ServerMessage) -> Self {
        OutboundFrame::Message(message)
    }
}
