//! Identifier aliases.
//!
//! Identifiers are issued by the persistence layer and treated as opaque
//! strings by the realtime core; they are compared, hashed and echoed back,
//! never parsed.

/// Room identifier
pub type RoomId = String;

/// User identifier
pub type UserId = String;

/// Message identifier
pub type MessageId = String;
