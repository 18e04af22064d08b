//! Realtime Infrastructure
//!
//! The in-process event bus shared by every connection, and the registry of
//! live connections.

mod event_bus;
mod registry;

pub use event_bus::{EventBus, FilteredSubscription, Subscriber};
pub use registry::{ConnectionInfo, ConnectionRegistry};
