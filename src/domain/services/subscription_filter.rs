//! Subscription Filter
//!
//! Pure predicates deciding which events a subscriber should see.

use std::collections::HashSet;

use crate::domain::events::RoomEvent;
use crate::domain::value_objects::{RoomId, UserId};

/// Selection criteria attached to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// Events scoped to any of these rooms.
    Rooms(HashSet<RoomId>),
    /// Events whose implicated user is this user.
    User(UserId),
}

impl SubscriptionFilter {
    pub fn room(room_id: impl Into<RoomId>) -> Self {
        SubscriptionFilter::Rooms(HashSet::from([room_id.into()]))
    }

    pub fn rooms<I, S>(room_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoomId>,
    {
        SubscriptionFilter::Rooms(room_ids.into_iter().map(Into::into).collect())
    }

    pub fn user(user_id: impl Into<UserId>) -> Self {
        SubscriptionFilter::User(user_id.into())
    }

    pub fn matches(&self, event: &RoomEvent) -> bool {
        match self {
            SubscriptionFilter::Rooms(rooms) => matches_rooms(event, rooms),
            SubscriptionFilter::User(user_id) => matches_user(event, user_id),
        }
    }
}

/// True iff the event is scoped to a room in `rooms`.
///
/// Events without a room (`room.created`) never match a room filter.
pub fn matches_rooms(event: &RoomEvent, rooms: &HashSet<RoomId>) -> bool {
    event.room_id().is_some_and(|room_id| rooms.contains(room_id))
}

/// True iff the event's implicated user is `user_id`.
pub fn matches_user(event: &RoomEvent, user_id: &str) -> bool {
    event.actor_id() == user_id
}
