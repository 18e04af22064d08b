//! WebSocket Realtime Endpoint
//!
//! Wire types, the per-connection session state machine and the socket handler.

pub mod handler;
pub mod messages;
pub mod session;

pub use handler::ws_handler;
pub use messages::{decode_client_message, ClientMessage, OutboundFrame, ServerMessage};
pub use session::{ConnectionSession, ConnectionState, SessionUser};
