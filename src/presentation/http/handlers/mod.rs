//! HTTP Handlers
//!
//! Operational endpoints served next to the WebSocket.

pub mod health;
