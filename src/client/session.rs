//! Reconnecting realtime client session.
//!
//! A single driver task owns the socket. It connects, authenticates, replays
//! the remembered room subscriptions, then multiplexes inbound frames, queued
//! commands and the health ping until the transport fails, after which it
//! waits out the backoff delay and starts over.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::backoff::Backoff;
use super::error::ClientError;
use super::state::{ClientConnectionState, ConnectionStatus};
use crate::config::ClientSettings;
use crate::domain::events::RoomEvent;
use crate::domain::value_objects::RoomId;
use crate::presentation::websocket::messages::{ClientMessage, ServerMessage};
use crate::shared::error::ErrorCode;

/// Supplies the access token, read again on every connection attempt.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// A token that never changes
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// What the application receives from the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A domain event from a subscribed room
    Room(RoomEvent),
    /// The server rejected a command
    Rejected { code: ErrorCode, message: String },
}

struct Shared {
    settings: ClientSettings,
    tokens: Arc<dyn TokenSource>,
    state: Mutex<ClientConnectionState>,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::Sender<ClientEvent>,
}

impl Shared {
    fn set_status(&self, status: ConnectionStatus) {
        self.state.lock().status = status;
        self.status.send_replace(status);
    }

    fn connection_lost(&self, status: ConnectionStatus) {
        self.state.lock().connection_lost(status);
        self.status.send_replace(status);
    }

    fn emit(&self, event: ClientEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Client event queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::trace!("Client event receiver dropped");
            }
        }
    }
}

struct Driver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<mpsc::Receiver<ClientMessage>>,
}

/// Resilient connection to the realtime server
pub struct RealtimeClient {
    shared: Arc<Shared>,
    commands: mpsc::Sender<ClientMessage>,
    idle_commands: Mutex<Option<mpsc::Receiver<ClientMessage>>>,
    driver: AsyncMutex<Option<Driver>>,
}

impl RealtimeClient {
    /// Create a disconnected client and the stream of events it will deliver.
    pub fn new(
        settings: ClientSettings,
        tokens: Arc<dyn TokenSource>,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::channel(settings.event_queue_capacity.max(1));
        let (commands_tx, commands_rx) = mpsc::channel(settings.command_queue_capacity.max(1));
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);

        let client = Self {
            shared: Arc::new(Shared {
                settings,
                tokens,
                state: Mutex::new(ClientConnectionState::default()),
                status,
                events: events_tx,
            }),
            commands: commands_tx,
            idle_commands: Mutex::new(Some(commands_rx)),
            driver: AsyncMutex::new(None),
        };

        (client, events_rx)
    }

    /// Start the connection loop. Calling it while already running is a no-op.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut driver = self.driver.lock().await;
        if driver.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            return Ok(());
        }

        let commands = self.idle_commands.lock().take().ok_or(ClientError::Closed)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(drive(self.shared.clone(), commands, shutdown_rx));

        tracing::debug!(url = %self.shared.settings.url, "Realtime client started");
        *driver = Some(Driver { shutdown, handle });
        Ok(())
    }

    /// Stop the connection loop and discard queued commands.
    ///
    /// When this returns no background work remains. Remembered room
    /// subscriptions survive, so a later `connect` resubscribes to them.
    pub async fn disconnect(&self) {
        let mut driver = self.driver.lock().await;
        let Some(Driver { shutdown, handle }) = driver.take() else {
            return;
        };

        let _ = shutdown.send(true);
        match handle.await {
            Ok(mut commands) => {
                let mut discarded = 0usize;
                while commands.try_recv().is_ok() {
                    discarded += 1;
                }
                if discarded > 0 {
                    tracing::debug!(discarded, "Discarded queued commands on disconnect");
                }
                *self.idle_commands.lock() = Some(commands);
            }
            Err(e) => tracing::error!(error = %e, "Realtime client driver failed"),
        }

        self.shared.connection_lost(ConnectionStatus::Disconnected);
        tracing::debug!("Realtime client stopped");
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    pub fn status_changes(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Wait until the client reaches `status`.
    pub async fn wait_for_status(&self, status: ConnectionStatus) -> Result<(), ClientError> {
        let mut changes = self.status_changes();
        changes
            .wait_for(|current| *current == status)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Closed)
    }

    pub fn snapshot(&self) -> ClientConnectionState {
        self.shared.state.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == ConnectionStatus::Authenticated
    }

    /// Remember `room_id` and ask the server to deliver its events.
    pub fn subscribe(&self, room_id: impl Into<RoomId>) -> Result<(), ClientError> {
        let room_id = room_id.into();
        self.shared.state.lock().subscribed_rooms.insert(room_id.clone());
        self.enqueue(ClientMessage::subscribe(room_id))
    }

    pub fn unsubscribe(&self, room_id: impl Into<RoomId>) -> Result<(), ClientError> {
        let room_id = room_id.into();
        self.shared.state.lock().subscribed_rooms.remove(&room_id);
        self.enqueue(ClientMessage::unsubscribe(room_id))
    }

    pub fn send_message(
        &self,
        room_id: impl Into<RoomId>,
        content: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.enqueue(ClientMessage::send_message(room_id, content))
    }

    pub fn typing(&self, room_id: impl Into<RoomId>, is_typing: bool) -> Result<(), ClientError> {
        self.enqueue(ClientMessage::typing(room_id, is_typing))
    }

    fn enqueue(&self, message: ClientMessage) -> Result<(), ClientError> {
        self.commands.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ClientError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ClientError::Closed,
        })
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.handle.abort();
        }
    }
}

/// Reconnect loop. Returns the command queue when told to shut down.
async fn drive(
    shared: Arc<Shared>,
    mut commands: mpsc::Receiver<ClientMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> mpsc::Receiver<ClientMessage> {
    let mut backoff = Backoff::new(shared.settings.backoff_base(), shared.settings.backoff_max());
    let mut unsent: Option<ClientMessage> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        shared.set_status(ConnectionStatus::Connecting);

        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = run_connection(&shared, &mut commands, &mut unsent, &mut backoff) => result,
        };

        let lost_status = if shared.state.lock().is_authenticated() {
            ConnectionStatus::Disconnected
        } else {
            ConnectionStatus::Error
        };
        shared.connection_lost(lost_status);

        let delay = backoff.next_delay();
        match result {
            Err(ClientError::AuthenticationRejected { code, message }) => {
                tracing::error!(%code, %message, retry_in = ?delay, "Authentication rejected");
                shared.emit(ClientEvent::Rejected { code, message });
            }
            Err(e) => tracing::warn!(error = %e, retry_in = ?delay, "Realtime connection lost"),
            Ok(()) => tracing::info!(retry_in = ?delay, "Realtime connection closed"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(delay) => {}
        }
    }

    commands
}

/// One connection attempt, from dial to transport failure.
async fn run_connection(
    shared: &Shared,
    commands: &mut mpsc::Receiver<ClientMessage>,
    unsent: &mut Option<ClientMessage>,
    backoff: &mut Backoff,
) -> Result<(), ClientError> {
    let token = shared.tokens.token().await.ok_or(ClientError::MissingToken)?;

    let (stream, _) = connect_async(shared.settings.url.as_str())
        .await
        .map_err(|e| ClientError::Connect(e.to_string()))?;
    tracing::info!(url = %shared.settings.url, "Connected to realtime server");

    let (mut write, mut read) = stream.split();

    shared.set_status(ConnectionStatus::Authenticating);
    send_frame(&mut write, &ClientMessage::auth(token)).await?;

    if let Some(message) = unsent.take() {
        if let Err(e) = send_frame(&mut write, &message).await {
            *unsent = Some(message);
            return Err(e);
        }
    }

    let mut ping = interval(shared.settings.ping_interval());
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // Skip first immediate tick

    loop {
        let authenticated = shared.state.lock().is_authenticated();

        tokio::select! {
            biased;

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Some(message) = decode_server_frame(&text) else {
                        continue;
                    };
                    match message {
                        ServerMessage::Authenticated { user_id, username } => {
                            tracing::info!(user_id = %user_id, "Realtime session authenticated");
                            let rooms = {
                                let mut state = shared.state.lock();
                                state.authenticated(user_id, username);
                                state.subscribed_rooms.clone()
                            };
                            shared.status.send_replace(ConnectionStatus::Authenticated);
                            backoff.reset();

                            for room_id in rooms {
                                send_frame(&mut write, &ClientMessage::subscribe(room_id)).await?;
                            }
                        }
                        ServerMessage::Error { code, message } => {
                            if !authenticated && code.is_auth_rejection() {
                                return Err(ClientError::AuthenticationRejected { code, message });
                            }
                            tracing::debug!(%code, %message, "Command rejected by server");
                            shared.emit(ClientEvent::Rejected { code, message });
                        }
                        ServerMessage::Event { event } => shared.emit(ClientEvent::Room(event)),
                        ServerMessage::Subscribed { room_id } => {
                            tracing::debug!(room_id = %room_id, "Subscribed");
                        }
                        ServerMessage::Unsubscribed { room_id } => {
                            tracing::debug!(room_id = %room_id, "Unsubscribed");
                        }
                        ServerMessage::Pong => tracing::trace!("Pong received"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ClientError::Transport("connection closed by server".into()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(ClientError::Transport(e.to_string())),
            },

            command = commands.recv() => {
                let Some(command) = command else {
                    return Ok(());
                };
                if let Err(e) = send_frame(&mut write, &command).await {
                    *unsent = Some(command);
                    return Err(e);
                }
            }

            _ = ping.tick(), if authenticated => {
                send_frame(&mut write, &ClientMessage::Ping).await?;
            }
        }
    }
}

async fn send_frame<S>(write: &mut S, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(message)?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))
}

/// Parse a server frame, dropping anything that does not match the schema.
fn decode_server_frame(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::error!(error = %e, "Dropping malformed frame from server");
            None
        }
    }
}
