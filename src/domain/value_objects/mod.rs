//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **RoomId / UserId / MessageId**: opaque identifiers issued by the persistence layer

mod ids;

pub use ids::*;
