//! # Domain Layer
//!
//! The domain layer contains the vocabulary of the realtime core.
//! It is independent of any transport or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Records carried in events (Room, MessageWithUser, ...) and collaborator traits
//! - **events**: The `RoomEvent` sum type fanned out by the event bus
//! - **value_objects**: Identifier types
//! - **services**: Subscription filtering
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits define data access contracts
//! - Events are immutable values with exhaustive matching

pub mod entities;
pub mod events;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use events::RoomEvent;
pub use services::SubscriptionFilter;
pub use value_objects::*;
