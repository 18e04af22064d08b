//! WebSocket Protocol Tests
//!
//! Drive `/ws` with a raw socket and check the frames that come back.

use std::sync::Arc;

use chrono::Utc;
use futures::SinkExt;
use hive_realtime::application::services::{JwtTokenVerifier, RealtimeServices};
use hive_realtime::domain::{MessageWithUser, RoomEvent};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{eventually, sign_token, test_settings, Directory, TestApp, JWT_SECRET};

fn message_in(room_id: &str, content: &str) -> RoomEvent {
    let now = Utc::now();
    RoomEvent::message_created(MessageWithUser {
        id: format!("m-{}", uuid::Uuid::new_v4()),
        room_id: room_id.into(),
        user_id: "u9".into(),
        content: content.into(),
        created_at: now,
        updated_at: now,
        username: "grace".into(),
        user_email: None,
        is_edited: false,
    })
}

#[tokio::test]
async fn test_auth_with_valid_token() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    ws.send_json(json!({"type": "auth", "token": "valid"})).await;

    assert_eq!(
        ws.next_json().await,
        json!({"type": "authenticated", "userId": "u1", "username": "ada"})
    );
    eventually("authenticated registry entry", || {
        app.state.connections.authenticated_count() == 1
    })
    .await;
}

#[tokio::test]
async fn test_auth_with_signed_jwt() {
    let directory = Directory::seeded();
    let services = RealtimeServices::new(
        Arc::new(JwtTokenVerifier::new(JWT_SECRET)),
        directory.clone(),
        directory.clone(),
        directory.clone(),
    );
    let app = TestApp::spawn_with(test_settings(), directory, Some(services)).await;
    let mut ws = app.connect().await;

    ws.send_json(json!({"type": "auth", "token": sign_token("u1")}))
        .await;
    assert_eq!(ws.next_json().await["type"], "authenticated");

    let mut other = app.connect().await;
    other
        .send_json(json!({"type": "auth", "token": "not-a-jwt"}))
        .await;
    let reply = other.next_json().await;
    assert_eq!(reply["code"], "AUTH_FAILED");
}

#[tokio::test]
async fn test_bad_token_is_rejected_and_connection_stays_usable() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    ws.send_json(json!({"type": "auth", "token": "forged"})).await;
    let reply = ws.next_json().await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "AUTH_FAILED");

    ws.send_json(json!({"type": "auth", "token": "valid"})).await;
    assert_eq!(ws.next_json().await["type"], "authenticated");
}

#[tokio::test]
async fn test_commands_before_auth_are_refused() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    let reply = ws.next_json().await;
    assert_eq!(reply["code"], "NOT_AUTHENTICATED");
    assert_eq!(app.bus().subscriber_count(), 0);

    ws.send_json(json!({"type": "ping"})).await;
    assert_eq!(ws.next_json().await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_subscribed_room_events_are_delivered_and_others_are_not() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;

    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    assert_eq!(
        ws.next_json().await,
        json!({"type": "subscribed", "roomId": "r1"})
    );

    app.bus().publish(message_in("r2", "elsewhere"));
    app.bus().publish(message_in("r1", "here"));

    let frame = ws.next_json().await;
    assert_eq!(frame["type"], "event");
    assert_eq!(frame["event"]["type"], "message.created");
    assert_eq!(frame["event"]["roomId"], "r1");
    assert_eq!(frame["event"]["message"]["content"], "here");
    ws.expect_silence().await;
}

#[tokio::test]
async fn test_empty_message_is_rejected_without_side_effects() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;
    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    ws.next_json().await;

    ws.send_json(json!({"type": "message.send", "roomId": "r1", "content": ""}))
        .await;

    let reply = ws.next_json().await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "VALIDATION_ERROR");
    ws.expect_silence().await;
    assert!(app.directory.stored_messages().is_empty());
}

#[tokio::test]
async fn test_sent_message_is_stored_and_fanned_out() {
    let app = TestApp::spawn().await;
    let mut author = app.connect_as("valid").await;
    let mut reader = app.connect_as("valid-u2").await;

    reader
        .send_json(json!({"type": "subscribe", "roomId": "r2"}))
        .await;
    assert_eq!(reader.next_json().await["type"], "subscribed");

    author
        .send_json(json!({"type": "message.send", "roomId": "r2", "content": "hello"}))
        .await;

    let frame = reader.next_json().await;
    assert_eq!(frame["event"]["type"], "message.created");
    assert_eq!(frame["event"]["message"]["content"], "hello");
    assert_eq!(frame["event"]["message"]["username"], "ada");
    assert_eq!(frame["event"]["message"]["user_id"], "u1");

    let stored = app.directory.stored_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].room_id, "r2");
    // author is not subscribed to r2
    author.expect_silence().await;
}

#[tokio::test]
async fn test_fully_escaped_message_at_length_limit_is_accepted() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;
    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    ws.next_json().await;

    let escaped = "\\u00e9".repeat(4000);
    let frame = format!(
        r#"{{"type":"message.send","roomId":"r1","content":"{}"}}"#,
        escaped
    );
    assert!(frame.len() > 16 * 1024);
    ws.send_text(&frame).await;

    let event = ws.next_json().await;
    assert_eq!(event["event"]["type"], "message.created");
    let content = event["event"]["message"]["content"].as_str().unwrap();
    assert_eq!(content, "é".repeat(4000));

    let stored = app.directory.stored_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content.chars().count(), 4000);
}

#[tokio::test]
async fn test_non_member_subscribe_is_refused() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid-u2").await;

    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;

    let reply = ws.next_json().await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "NOT_ROOM_MEMBER");
    assert_eq!(app.bus().subscriber_count(), 0);

    app.bus().publish(message_in("r1", "private"));
    ws.expect_silence().await;
}

#[tokio::test]
async fn test_missing_room_is_reported() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;

    ws.send_json(json!({"type": "subscribe", "roomId": "nowhere"}))
        .await;
    assert_eq!(ws.next_json().await["code"], "ROOM_NOT_FOUND");

    ws.send_json(json!({"type": "subscribe", "roomId": "r3"}))
        .await;
    assert_eq!(ws.next_json().await["code"], "NOT_ROOM_MEMBER");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery_and_is_idempotent() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;
    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    ws.next_json().await;

    for _ in 0..2 {
        ws.send_json(json!({"type": "unsubscribe", "roomId": "r1"}))
            .await;
        assert_eq!(
            ws.next_json().await,
            json!({"type": "unsubscribed", "roomId": "r1"})
        );
    }
    assert_eq!(app.bus().subscriber_count(), 0);

    app.bus().publish(message_in("r1", "gone"));
    ws.expect_silence().await;
}

#[tokio::test]
async fn test_resubscribing_does_not_duplicate_events() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;

    for room in ["r1", "r2", "r1"] {
        ws.send_json(json!({"type": "subscribe", "roomId": room}))
            .await;
        assert_eq!(ws.next_json().await["type"], "subscribed");
    }
    assert_eq!(app.bus().subscriber_count(), 1);

    app.bus().publish(message_in("r1", "once"));
    assert_eq!(ws.next_json().await["event"]["message"]["content"], "once");
    ws.expect_silence().await;
}

#[tokio::test]
async fn test_typing_reaches_other_subscribers() {
    let app = TestApp::spawn().await;
    let mut typist = app.connect_as("valid").await;
    let mut reader = app.connect_as("valid-u2").await;
    reader
        .send_json(json!({"type": "subscribe", "roomId": "r2"}))
        .await;
    reader.next_json().await;

    typist
        .send_json(json!({"type": "typing", "roomId": "r2", "isTyping": true}))
        .await;

    let frame = reader.next_json().await;
    assert_eq!(frame["event"]["type"], "user.typing");
    assert_eq!(frame["event"]["userId"], "u1");
    assert_eq!(frame["event"]["username"], "ada");
    assert_eq!(frame["event"]["isTyping"], true);
}

#[tokio::test]
async fn test_malformed_frames_get_error_codes() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;

    ws.send_text("{not json").await;
    assert_eq!(ws.next_json().await["code"], "INVALID_JSON");

    ws.send_json(json!({"type": "dance"})).await;
    let reply = ws.next_json().await;
    assert_eq!(reply["code"], "UNKNOWN_MESSAGE_TYPE");
    assert_eq!(reply["message"], "Unknown message type: dance");

    ws.send_json(json!({"roomId": "r1"})).await;
    assert_eq!(ws.next_json().await["code"], "INVALID_MESSAGE");

    ws.send_json(json!({"type": "auth"})).await;
    assert_eq!(ws.next_json().await["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_binary_frames_are_rejected() {
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    let app = TestApp::spawn().await;
    let (mut stream, _) = connect_async(app.ws_url()).await.unwrap();

    stream
        .send(Message::Binary(vec![1u8, 2, 3].into()))
        .await
        .unwrap();

    let frame = loop {
        match futures::StreamExt::next(&mut stream).await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(_)) => continue,
            other => panic!("connection ended: {:?}", other),
        }
    };
    let reply: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(reply["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_unauthenticated_connection_times_out() {
    let mut settings = test_settings();
    settings.realtime.auth_timeout_secs = 1;
    let app = TestApp::spawn_with(settings, Directory::seeded(), None).await;
    let mut ws = app.connect().await;

    let reply = ws.next_json().await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "AUTH_TIMEOUT");
    ws.expect_closed().await;

    eventually("registry cleanup", || app.state.connections.connection_count() == 0).await;
}

#[tokio::test]
async fn test_authenticated_connection_outlives_auth_timeout() {
    let mut settings = test_settings();
    settings.realtime.auth_timeout_secs = 1;
    let app = TestApp::spawn_with(settings, Directory::seeded(), None).await;
    let mut ws = app.connect_as("valid").await;

    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;

    ws.send_json(json!({"type": "ping"})).await;
    assert_eq!(ws.next_json().await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_closing_releases_subscription_and_registry_entry() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;
    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    ws.next_json().await;
    assert_eq!(app.bus().subscriber_count(), 1);

    ws.close().await;

    eventually("subscription release", || app.bus().subscriber_count() == 0).await;
    eventually("registry cleanup", || app.state.connections.connection_count() == 0).await;
}

#[tokio::test]
async fn test_reauthenticating_as_another_user_clears_rooms() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as("valid").await;
    ws.send_json(json!({"type": "subscribe", "roomId": "r1"}))
        .await;
    ws.next_json().await;

    ws.send_json(json!({"type": "auth", "token": "valid-u2"}))
        .await;
    let reply = ws.next_json().await;
    assert_eq!(reply["userId"], "u2");
    assert_eq!(app.bus().subscriber_count(), 0);

    app.bus().publish(message_in("r1", "not for u2"));
    ws.expect_silence().await;
}
