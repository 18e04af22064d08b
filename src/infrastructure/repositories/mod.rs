//! Repository Implementations
//!
//! PostgreSQL implementations of the collaborator traits the realtime core
//! consumes. They read and write the tables owned by the REST service.
//!
//! ## Available Repositories
//!
//! - **PgRoomRepository** - room existence and membership (`RoomLookup`)
//! - **PgMessageRepository** - message persistence (`MessageStore`)
//! - **PgUserRepository** - public user profiles (`UserLookup`)

mod message_repository;
mod room_repository;
mod user_repository;

pub use message_repository::PgMessageRepository;
pub use room_repository::PgRoomRepository;
pub use user_repository::PgUserRepository;

use uuid::Uuid;

/// Parse a wire id into the column type.
///
/// Every key column is a UUID, so an id that does not parse cannot match any
/// row and callers treat it as absent without querying.
pub(crate) fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}
