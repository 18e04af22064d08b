//! # Domain Entities
//!
//! Records the realtime core carries inside events, plus the collaborator
//! contracts it consumes.
//!
//! ## Entities
//!
//! - **Room**: a chat room (channel or direct message)
//! - **Message / MessageWithUser**: a stored message, optionally joined with its author
//! - **UserProfile**: public user details
//! - **MemberRole**: a user's role in a room
//!
//! ## Collaborator Traits
//!
//! `RoomLookup`, `MessageStore` and `UserLookup` are implemented in the
//! infrastructure layer, following the dependency inversion principle.

mod member;
mod message;
mod room;
mod user;

pub use member::{MemberRole, RoomLookup};
pub use message::{Message, MessageStore, MessageWithUser, MAX_MESSAGE_LENGTH};
pub use room::{Room, RoomType};
pub use user::{UserLookup, UserProfile};

#[cfg(test)]
pub use member::MockRoomLookup;
#[cfg(test)]
pub use message::MockMessageStore;
#[cfg(test)]
pub use user::MockUserLookup;
