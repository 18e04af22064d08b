//! Common Test Utilities
//!
//! In-memory collaborators, a spawned server on an ephemeral port, a raw
//! WebSocket helper and a TCP proxy that can sever live connections.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fake::{faker::internet::en::Username, Fake};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use hive_realtime::application::services::{
    AuthError, RealtimeServices, TokenVerifier, VerifiedToken,
};
use hive_realtime::config::{
    ClientSettings, CorsSettings, DatabaseSettings, JwtSettings, RealtimeSettings,
    ServerSettings, Settings,
};
use hive_realtime::domain::{
    Message as StoredMessage, MessageStore, RoomLookup, UserLookup, UserProfile,
};
use hive_realtime::infrastructure::realtime::EventBus;
use hive_realtime::shared::error::ServiceError;
use hive_realtime::startup::{AppState, Application};

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Default wait for anything that should happen
pub const WAIT: Duration = Duration::from_secs(5);

/// Users, rooms, memberships and stored messages, all in memory
#[derive(Default)]
pub struct Directory {
    users: Mutex<HashMap<String, UserProfile>>,
    members: Mutex<HashMap<String, HashSet<String>>>,
    messages: Mutex<Vec<StoredMessage>>,
    tokens: Mutex<HashMap<String, String>>,
}

impl Directory {
    /// u1 "ada" with token `valid`, member of r1 and r2; u2 member of r2 only.
    /// Room r3 exists with no members.
    pub fn seeded() -> Arc<Self> {
        let directory = Arc::new(Self::default());
        directory.add_user("u1", "ada", "valid");
        directory.add_user("u2", &Username().fake::<String>(), "valid-u2");
        directory.add_room("r1", &["u1"]);
        directory.add_room("r2", &["u1", "u2"]);
        directory.add_room("r3", &[]);
        directory
    }

    pub fn add_user(&self, id: &str, username: &str, token: &str) {
        self.users.lock().insert(
            id.to_string(),
            UserProfile {
                id: id.to_string(),
                username: username.to_string(),
                email: Some(format!("{}@example.com", username)),
            },
        );
        self.tokens.lock().insert(token.to_string(), id.to_string());
    }

    pub fn add_room(&self, id: &str, members: &[&str]) {
        self.members.lock().insert(
            id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn username(&self, id: &str) -> Option<String> {
        self.users.lock().get(id).map(|u| u.username.clone())
    }

    pub fn stored_messages(&self) -> Vec<StoredMessage> {
        self.messages.lock().clone()
    }

    pub fn services(self: &Arc<Self>) -> RealtimeServices {
        RealtimeServices::new(self.clone(), self.clone(), self.clone(), self.clone())
    }
}

#[async_trait]
impl TokenVerifier for Directory {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        self.tokens
            .lock()
            .get(token)
            .map(|user_id| VerifiedToken {
                user_id: user_id.clone(),
                email: None,
            })
            .ok_or(AuthError::InvalidToken)
    }
}

#[async_trait]
impl RoomLookup for Directory {
    async fn is_member(&self, room_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self
            .members
            .lock()
            .get(room_id)
            .is_some_and(|members| members.contains(user_id)))
    }

    async fn exists(&self, room_id: &str) -> Result<bool, ServiceError> {
        Ok(self.members.lock().contains_key(room_id))
    }
}

#[async_trait]
impl MessageStore for Directory {
    async fn create(
        &self,
        user_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<StoredMessage, ServiceError> {
        let now = Utc::now();
        let message = StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.messages.lock().push(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl UserLookup for Directory {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserProfile>, ServiceError> {
        Ok(self.users.lock().get(id).cloned())
    }
}

/// Settings bound to an ephemeral local port with fast client timings
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/unused".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
        },
        jwt: JwtSettings {
            secret: JWT_SECRET.into(),
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        realtime: RealtimeSettings::default(),
        client: ClientSettings {
            backoff_base_ms: 50,
            backoff_max_ms: 200,
            ..ClientSettings::default()
        },
        environment: "test".into(),
    }
}

/// A running server backed by the in-memory directory
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub directory: Arc<Directory>,
    server: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_settings(), Directory::seeded(), None).await
    }

    pub async fn spawn_with(
        settings: Settings,
        directory: Arc<Directory>,
        services: Option<RealtimeServices>,
    ) -> Self {
        let services = services.unwrap_or_else(|| directory.services());
        let app = Application::build_with_services(settings, services, None)
            .await
            .expect("failed to build application");
        let addr = app.local_addr().expect("no local address");
        let state = app.state().clone();
        let server = tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        Self {
            addr,
            state,
            directory,
            server,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn bus(&self) -> &EventBus {
        &self.state.bus
    }

    pub async fn connect(&self) -> WsClient {
        WsClient::connect(&self.ws_url()).await
    }

    /// Connect and authenticate with `token`, consuming the confirmation
    pub async fn connect_as(&self, token: &str) -> WsClient {
        let mut ws = self.connect().await;
        ws.send_json(serde_json::json!({"type": "auth", "token": token}))
            .await;
        let reply = ws.next_json().await;
        assert_eq!(reply["type"], "authenticated", "auth failed: {}", reply);
        ws
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Raw protocol client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url).await.expect("websocket connect failed");
        Self { stream }
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send failed");
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Next JSON text frame, failing the test after `WAIT`
    pub async fn next_json(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(WAIT, self.stream.next())
                .await
                .expect("timed out waiting for frame")
                .expect("connection ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).expect("server sent invalid JSON");
            }
        }
    }

    /// Assert nothing but control frames arrives for a short while
    pub async fn expect_silence(&mut self) {
        let deadline = tokio::time::sleep(Duration::from_millis(200));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return,
                frame = self.stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => panic!("unexpected frame: {}", text),
                    Some(Ok(_)) => continue,
                    _ => return,
                }
            }
        }
    }

    /// Wait for the server to close the connection
    pub async fn expect_closed(&mut self) {
        let closed = tokio::time::timeout(WAIT, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "connection was not closed");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// TCP forwarder whose live connections can be cut on demand
pub struct FlakyProxy {
    pub addr: SocketAddr,
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
    acceptor: JoinHandle<()>,
}

impl FlakyProxy {
    pub async fn start(upstream: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("proxy bind failed");
        let addr = listener.local_addr().expect("proxy address");
        let connections: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();

        let tracked = connections.clone();
        let acceptor = tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                let handle = tokio::spawn(async move {
                    if let Ok(mut outbound) = TcpStream::connect(upstream).await {
                        let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                    }
                });
                tracked.lock().push(handle);
            }
        });

        Self {
            addr,
            connections,
            acceptor,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Drop every proxied connection; new ones are still accepted
    pub fn sever(&self) {
        for handle in self.connections.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for FlakyProxy {
    fn drop(&mut self) {
        self.acceptor.abort();
        self.sever();
    }
}

/// Poll `condition` until it holds, failing the test after `WAIT`
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    while !condition() {
        assert!(start.elapsed() < WAIT, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Sign an HS256 token the way the REST service issues them
pub fn sign_token(user_id: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = hive_realtime::application::services::Claims {
        id: user_id.to_string(),
        email: None,
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iat: Some(now.timestamp()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to sign token")
}

/// Shared state for router-level tests that never open a socket
pub fn app_state(directory: &Arc<Directory>) -> AppState {
    let settings = test_settings();
    AppState {
        bus: EventBus::new(settings.realtime.bus_capacity),
        services: directory.services(),
        connections: Arc::new(hive_realtime::infrastructure::realtime::ConnectionRegistry::new()),
        db: None,
        settings: Arc::new(settings),
    }
}

/// Send one request straight through `router`
pub async fn oneshot(
    router: axum::Router,
    request: axum::http::Request<axum::body::Body>,
) -> axum::response::Response {
    use tower::ServiceExt;

    router.oneshot(request).await.expect("router is infallible")
}
