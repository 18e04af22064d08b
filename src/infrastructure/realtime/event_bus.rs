//! Event Bus
//!
//! In-process fan-out of domain events to every live subscriber. Built on a
//! bounded `tokio::sync::broadcast` channel: publishing never waits on slow
//! consumers, and a subscriber that falls more than `capacity` events behind
//! skips the oldest ones it missed.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::domain::events::RoomEvent;
use crate::domain::services::SubscriptionFilter;
use crate::domain::value_objects::{RoomId, UserId};
use crate::infrastructure::metrics;

/// Shared handle to the broadcast channel. Cloning is cheap and every clone
/// publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<RoomEvent>>,
    capacity: usize,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a bus whose subscribers each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was queued for. Zero
    /// subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: RoomEvent) -> usize {
        let event_type = event.event_type();
        metrics::record_event_published(event_type);

        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => {
                tracing::trace!(event_type, receivers, "Event published");
                receivers
            }
            Err(_) => {
                tracing::trace!(event_type, "Event published with no subscribers");
                0
            }
        }
    }

    /// Register a new independent consumer. Events published before this call
    /// are never seen by the returned handle.
    pub fn subscribe(&self) -> Subscriber {
        Subscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscribe_filtered(&self, filter: SubscriptionFilter) -> FilteredSubscription {
        FilteredSubscription {
            subscriber: self.subscribe(),
            filter,
        }
    }

    pub fn subscribe_to_room(&self, room_id: impl Into<RoomId>) -> FilteredSubscription {
        self.subscribe_filtered(SubscriptionFilter::room(room_id))
    }

    pub fn subscribe_to_rooms(&self, room_ids: HashSet<RoomId>) -> FilteredSubscription {
        self.subscribe_filtered(SubscriptionFilter::Rooms(room_ids))
    }

    pub fn subscribe_to_user(&self, user_id: impl Into<UserId>) -> FilteredSubscription {
        self.subscribe_filtered(SubscriptionFilter::user(user_id))
    }

    /// Number of live subscriber handles.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// One consumer's queue on the bus. Dropping it releases the slot.
#[derive(Debug)]
pub struct Subscriber {
    receiver: broadcast::Receiver<Arc<RoomEvent>>,
}

impl Subscriber {
    /// Wait for the next event in publish order.
    ///
    /// Returns `None` once every `EventBus` handle has been dropped.
    pub async fn recv(&mut self) -> Option<Arc<RoomEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Events queued for this handle and not yet received.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Take the next event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<RoomEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

fn record_lag(skipped: u64) {
    tracing::warn!(skipped, "Subscriber lagged behind the event bus, oldest events dropped");
    metrics::record_events_lagged(skipped);
}

/// A subscriber that only yields events matching its filter.
#[derive(Debug)]
pub struct FilteredSubscription {
    subscriber: Subscriber,
    filter: SubscriptionFilter,
}

impl FilteredSubscription {
    pub fn filter(&self) -> &SubscriptionFilter {
        &self.filter
    }

    /// Wait for the next matching event.
    pub async fn next(&mut self) -> Option<Arc<RoomEvent>> {
        loop {
            let event = self.subscriber.recv().await?;
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Take the next matching event already queued, without waiting.
    pub fn try_next(&mut self) -> Option<Arc<RoomEvent>> {
        loop {
            let event = self.subscriber.try_recv()?;
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }
}
