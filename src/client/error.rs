//! Client Error Types

use crate::shared::error::ErrorCode;

/// Errors surfaced by the realtime client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("No access token available")]
    MissingToken,

    #[error("Authentication rejected ({code}): {message}")]
    AuthenticationRejected { code: ErrorCode, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Command queue is full")]
    QueueFull,

    #[error("Client is closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
