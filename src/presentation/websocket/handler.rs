//! WebSocket Connection Handler
//!
//! Bridges one upgraded socket to its `ConnectionSession`: decodes inbound
//! frames, dispatches them, and writes queued outbound frames back.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::{decode_client_message, OutboundFrame};
use super::session::ConnectionSession;
use crate::shared::error::RealtimeError;
use crate::startup::AppState;

/// How long the writer may keep flushing after the session ends
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limits = &state.settings.realtime;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    state.connections.register(connection_id);

    tracing::info!(connection_id = %connection_id, "WebSocket connection opened");

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Create channel for outgoing frames
    let (tx, mut rx) =
        mpsc::channel::<OutboundFrame>(state.settings.realtime.outbound_queue_capacity);

    // Spawn task to forward frames from channel to WebSocket
    let mut sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame.to_json() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Failed to serialize frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.close().await;
    });

    let mut session = ConnectionSession::new(
        connection_id,
        state.bus.clone(),
        state.services.clone(),
        tx,
    );

    let auth_deadline = tokio::time::sleep(state.settings.realtime.auth_timeout());
    tokio::pin!(auth_deadline);

    // Main message loop
    loop {
        tokio::select! {
            msg = receiver.next() => {
                let outcome = match msg {
                    Some(Ok(Message::Text(text))) => match decode_client_message(&text) {
                        Ok(message) => session.handle(message).await,
                        Err(error) => {
                            tracing::debug!(
                                connection_id = %connection_id,
                                error = %error,
                                "Malformed frame"
                            );
                            session.reject(&error).await
                        }
                    },
                    Some(Ok(Message::Binary(_))) => {
                        session
                            .reject(&RealtimeError::InvalidMessage("binary frames are not supported".into()))
                            .await
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed by client");
                        break;
                    }
                    // Ping/Pong are answered by axum
                    Some(Ok(_)) => Ok(()),
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                };

                if let Err(e) = outcome {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Outbound queue closed");
                    break;
                }

                state.connections.update(
                    connection_id,
                    session.user_id(),
                    session.subscribed_rooms().len(),
                );
            }

            _ = &mut auth_deadline, if !session.is_authenticated() => {
                tracing::info!(connection_id = %connection_id, "Authentication timeout, closing connection");
                let _ = session.reject(&RealtimeError::AuthTimeout).await;
                break;
            }
        }
    }

    // Cleanup
    let user_id = session.user_id().map(str::to_owned);
    session.close().await;
    drop(session);

    if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
        sender_task.abort();
    }
    state.connections.unregister(connection_id);

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?user_id,
        "WebSocket connection closed"
    );
}
