//! Realtime Client
//!
//! Consumer-side session that keeps itself connected and authenticated,
//! replays room subscriptions after every reconnect and hands validated
//! events to the application.
//!
//! ```rust,ignore
//! let (client, mut events) = RealtimeClient::new(settings.client, Arc::new(StaticToken(token)));
//! client.connect().await?;
//! client.subscribe("room-1")?;
//! while let Some(event) = events.recv().await {
//!     // ...
//! }
//! ```

mod backoff;
mod error;
mod session;
mod state;

pub use backoff::Backoff;
pub use error::ClientError;
pub use session::{ClientEvent, RealtimeClient, StaticToken, TokenSource};
pub use state::{ClientConnectionState, ConnectionStatus};
