//! WebSocket Session Management
//!
//! `ConnectionSession` is the per-connection protocol state machine. It is
//! owned by the connection's handler task and mutated only from there. It
//! owns at most one delivery task, which holds the connection's single bus
//! subscription.

use std::collections::HashSet;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::{ClientMessage, OutboundFrame, ServerMessage};
use crate::application::services::RealtimeServices;
use crate::domain::events::RoomEvent;
use crate::domain::entities::MessageWithUser;
use crate::domain::services::SubscriptionFilter;
use crate::domain::value_objects::{RoomId, UserId};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::{EventBus, Subscriber};
use crate::shared::error::{ErrorKind, RealtimeError};

/// Protocol phase of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Closed,
}

/// Identity bound to the connection by a successful `auth`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: UserId,
    pub username: String,
}

/// Background loop forwarding matching bus events to the connection.
///
/// The task owns the connection's bus receiver and hands it back when
/// stopped, so events still queued in it survive a change of room set.
#[derive(Debug)]
struct DeliveryTask {
    rooms: HashSet<RoomId>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Subscriber>>,
}

impl DeliveryTask {
    /// Forward events for `rooms`. The first `backlog` events were already
    /// queued before this room set took effect and are matched against
    /// `carried` instead, the rooms subscribed both before and after.
    fn spawn(
        connection_id: Uuid,
        mut subscriber: Subscriber,
        backlog: usize,
        carried: SubscriptionFilter,
        rooms: HashSet<RoomId>,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let filter = SubscriptionFilter::Rooms(rooms.clone());

        let handle = tokio::spawn(async move {
            let mut backlog = backlog;
            loop {
                let event = tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    event = subscriber.recv() => event,
                };
                let Some(event) = event else {
                    break;
                };

                let current = if backlog > 0 {
                    backlog -= 1;
                    &carried
                } else {
                    &filter
                };
                if !current.matches(&event) {
                    continue;
                }

                if outbound.send(OutboundFrame::Event(event)).await.is_err() {
                    break;
                }
                metrics::record_event_delivered();
            }
            tracing::trace!(connection_id = %connection_id, "Delivery task finished");
            subscriber
        });

        Self {
            rooms,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Ask the loop to finish and take its receiver back.
    ///
    /// Returns `None` if the task died without returning it.
    async fn stop(mut self) -> Option<Subscriber> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}

impl Drop for DeliveryTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Per-connection authentication and subscription state
pub struct ConnectionSession {
    connection_id: Uuid,
    state: ConnectionState,
    user: Option<SessionUser>,
    subscribed_rooms: HashSet<RoomId>,
    delivery: Option<DeliveryTask>,
    bus: EventBus,
    services: RealtimeServices,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ConnectionSession {
    pub fn new(
        connection_id: Uuid,
        bus: EventBus,
        services: RealtimeServices,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        Self {
            connection_id,
            state: ConnectionState::Unauthenticated,
            user: None,
            subscribed_rooms: HashSet::new(),
            delivery: None,
            bus,
            services,
            outbound,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    pub fn subscribed_rooms(&self) -> &HashSet<RoomId> {
        &self.subscribed_rooms
    }

    pub fn has_active_delivery(&self) -> bool {
        self.delivery.is_some()
    }

    /// Apply one decoded command.
    ///
    /// Command failures are answered with a single error frame and leave the
    /// session usable. Only a closed outbound queue is returned as an error,
    /// meaning the transport is gone.
    pub async fn handle(&mut self, message: ClientMessage) -> Result<(), RealtimeError> {
        if self.state == ConnectionState::Closed {
            return Err(RealtimeError::Transport("session closed".into()));
        }

        let kind = message.type_name();
        let result = match message {
            ClientMessage::Auth { token } => self.authenticate(&token).await,
            ClientMessage::Subscribe(payload) => self.subscribe(payload.room_id).await,
            ClientMessage::Unsubscribe(payload) => self.unsubscribe(payload.room_id).await,
            ClientMessage::SendMessage(payload) => {
                self.send_message(&payload.room_id, &payload.content).await
            }
            ClientMessage::Typing(payload) => self.typing(&payload.room_id, payload.is_typing).await,
            ClientMessage::Ping => self.send(ServerMessage::Pong).await,
        };

        match result {
            Err(RealtimeError::Transport(reason)) => Err(RealtimeError::Transport(reason)),
            Err(error) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    user_id = ?self.user_id(),
                    command = kind,
                    error = %error,
                    "Command rejected"
                );
                self.reject(&error).await
            }
            Ok(()) => Ok(()),
        }
    }

    /// Answer a rejected frame with its error frame.
    pub async fn reject(&self, error: &RealtimeError) -> Result<(), RealtimeError> {
        match error.kind() {
            ErrorKind::Internal | ErrorKind::Transport => tracing::error!(
                connection_id = %self.connection_id,
                error = %error,
                "Internal failure while serving command"
            ),
            _ => {}
        }
        metrics::record_frame_rejected(error.code().as_str());
        self.send(ServerMessage::from_error(error)).await
    }

    /// Stop delivery and release the bus subscription. Idempotent.
    pub async fn close(&mut self) {
        self.stop_delivery().await;
        self.subscribed_rooms.clear();
        self.state = ConnectionState::Closed;
    }

    async fn authenticate(&mut self, token: &str) -> Result<(), RealtimeError> {
        let previous = self.state;
        self.state = ConnectionState::Authenticating;

        let resolved = self.resolve_user(token).await;
        let user = match resolved {
            Ok(user) => user,
            Err(error) => {
                self.state = previous;
                return Err(error);
            }
        };

        if self.user_id().is_some_and(|current| current != user.user_id) {
            tracing::info!(
                connection_id = %self.connection_id,
                previous_user_id = ?self.user_id(),
                user_id = %user.user_id,
                "Connection re-authenticated as another user, dropping subscriptions"
            );
            self.stop_delivery().await;
            self.subscribed_rooms.clear();
        }

        tracing::info!(
            connection_id = %self.connection_id,
            user_id = %user.user_id,
            "Connection authenticated"
        );

        let reply = ServerMessage::Authenticated {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
        };
        self.user = Some(user);
        self.state = ConnectionState::Authenticated;
        self.send(reply).await
    }

    async fn resolve_user(&self, token: &str) -> Result<SessionUser, RealtimeError> {
        let verified = self
            .services
            .tokens
            .verify(token)
            .await
            .map_err(|e| RealtimeError::Authentication(e.to_string()))?;

        match self.services.users.find_by_id(&verified.user_id).await {
            Ok(Some(profile)) => Ok(SessionUser {
                user_id: verified.user_id,
                username: profile.username,
            }),
            Ok(None) => Err(RealtimeError::UserNotFound(verified.user_id)),
            Err(e) => {
                tracing::error!(
                    connection_id = %self.connection_id,
                    user_id = %verified.user_id,
                    error = %e,
                    "User lookup failed during authentication"
                );
                Err(RealtimeError::Authentication("user lookup failed".into()))
            }
        }
    }

    async fn subscribe(&mut self, room_id: RoomId) -> Result<(), RealtimeError> {
        let user_id = self.require_user()?.user_id.clone();

        if self.subscribed_rooms.contains(&room_id) {
            return self.send(ServerMessage::Subscribed { room_id }).await;
        }

        self.ensure_member(&room_id, &user_id)
            .await
            .map_err(|error| match error {
                RealtimeError::Internal(reason) => {
                    tracing::error!(
                        connection_id = %self.connection_id,
                        user_id = %user_id,
                        room_id = %room_id,
                        error = %reason,
                        "Room access check failed"
                    );
                    RealtimeError::RoomAccessDenied(room_id.clone())
                }
                other => other,
            })?;

        self.subscribed_rooms.insert(room_id.clone());
        tracing::debug!(
            connection_id = %self.connection_id,
            user_id = %user_id,
            room_id = %room_id,
            rooms = self.subscribed_rooms.len(),
            "Room subscribed"
        );

        self.restart_delivery(ServerMessage::Subscribed { room_id })
            .await
    }

    async fn unsubscribe(&mut self, room_id: RoomId) -> Result<(), RealtimeError> {
        self.require_user()?;

        if !self.subscribed_rooms.remove(&room_id) {
            return self.send(ServerMessage::Unsubscribed { room_id }).await;
        }

        tracing::debug!(
            connection_id = %self.connection_id,
            room_id = %room_id,
            rooms = self.subscribed_rooms.len(),
            "Room unsubscribed"
        );

        self.restart_delivery(ServerMessage::Unsubscribed { room_id })
            .await
    }

    async fn send_message(&mut self, room_id: &str, content: &str) -> Result<(), RealtimeError> {
        let user_id = self.require_user()?.user_id.clone();

        self.ensure_member(room_id, &user_id).await?;

        let message = self
            .services
            .messages
            .create(&user_id, room_id, content)
            .await
            .map_err(|e| RealtimeError::MessageSendFailed(e.to_string()))?;

        let author = match self.services.users.find_by_id(&user_id).await {
            Ok(Some(author)) => author,
            Ok(None) => {
                return Err(RealtimeError::MessageSendFailed(format!(
                    "author {} not found",
                    user_id
                )))
            }
            Err(e) => return Err(RealtimeError::MessageSendFailed(e.to_string())),
        };

        let message_id = message.id.clone();
        let receivers = self
            .bus
            .publish(RoomEvent::message_created(MessageWithUser::new(message, &author)));

        tracing::debug!(
            connection_id = %self.connection_id,
            user_id = %user_id,
            room_id = %room_id,
            message_id = %message_id,
            receivers,
            "Message published"
        );
        Ok(())
    }

    async fn typing(&mut self, room_id: &str, is_typing: bool) -> Result<(), RealtimeError> {
        let user = self.require_user()?.clone();

        if !self.subscribed_rooms.contains(room_id) {
            self.ensure_member(room_id, &user.user_id).await?;
        }

        self.bus.publish(RoomEvent::user_typing(
            room_id,
            user.user_id,
            user.username,
            is_typing,
        ));
        Ok(())
    }

    fn require_user(&self) -> Result<&SessionUser, RealtimeError> {
        match (&self.state, &self.user) {
            (ConnectionState::Authenticated, Some(user)) => Ok(user),
            _ => Err(RealtimeError::NotAuthenticated),
        }
    }

    /// Membership check, distinguishing a missing room from a foreign one.
    async fn ensure_member(&self, room_id: &str, user_id: &str) -> Result<(), RealtimeError> {
        let rooms = &self.services.rooms;

        let is_member = rooms
            .is_member(room_id, user_id)
            .await
            .map_err(|e| RealtimeError::Internal(format!("membership lookup: {}", e)))?;
        if is_member {
            return Ok(());
        }

        let exists = rooms
            .exists(room_id)
            .await
            .map_err(|e| RealtimeError::Internal(format!("room lookup: {}", e)))?;
        if exists {
            Err(RealtimeError::NotRoomMember(room_id.to_string()))
        } else {
            Err(RealtimeError::RoomNotFound(room_id.to_string()))
        }
    }

    /// Replace the delivery task for the current room set.
    ///
    /// The old task is stopped before the new one starts and its receiver is
    /// reused, so events for rooms that stay subscribed are neither lost nor
    /// repeated. `reply` is queued before the new task can queue any event.
    async fn restart_delivery(&mut self, reply: ServerMessage) -> Result<(), RealtimeError> {
        let previous = match self.delivery.take() {
            Some(task) => {
                let rooms = task.rooms.clone();
                task.stop().await.map(|subscriber| (subscriber, rooms))
            }
            None => None,
        };

        if self.subscribed_rooms.is_empty() {
            drop(previous);
            return self.send(reply).await;
        }

        let rooms = self.subscribed_rooms.clone();
        let (subscriber, backlog, carried) = match previous {
            Some((subscriber, previous_rooms)) => {
                let backlog = subscriber.pending();
                let carried: HashSet<RoomId> = previous_rooms.intersection(&rooms).cloned().collect();
                (subscriber, backlog, carried)
            }
            None => (self.bus.subscribe(), 0, HashSet::new()),
        };

        self.send(reply).await?;

        self.delivery = Some(DeliveryTask::spawn(
            self.connection_id,
            subscriber,
            backlog,
            SubscriptionFilter::Rooms(carried),
            rooms,
            self.outbound.clone(),
        ));
        Ok(())
    }

    async fn stop_delivery(&mut self) {
        if let Some(task) = self.delivery.take() {
            drop(task.stop().await);
        }
    }

    async fn send(&self, frame: impl Into<OutboundFrame>) -> Result<(), RealtimeError> {
        self.outbound
            .send(frame.into())
            .await
            .map_err(|_| RealtimeError::Transport("outbound queue closed".into()))
    }
}
