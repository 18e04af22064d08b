//! Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket realtime endpoint.

pub mod http;
pub mod middleware;
pub mod websocket;
