//! Shared harness for the end-to-end scenarios (§8): spins up the real
//! router on an ephemeral port and hands back a small JSON-RPC client over
//! `tokio-tungstenite`, grounded in the teacher's `MockWsClient`.

use camera_ws_server::auth::JwtTokenValidator;
use camera_ws_server::config::ServerConfig;
use camera_ws_server::connection::ConnectionRegistry;
use camera_ws_server::controller::InMemoryMediaController;
use camera_ws_server::events::EventManager;
use camera_ws_server::metrics::Metrics;
use camera_ws_server::methods::{self, HandlerContext};
use camera_ws_server::middleware::Pipeline;
use camera_ws_server::rate_limit::RateLimiter;
use camera_ws_server::registry::MethodRegistry;
use camera_ws_server::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use rpc_protocol::Role;
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

/// All e2e tests sign tokens against this secret; the server under test is
/// always constructed with a `JwtTokenValidator` over the same bytes.
pub const JWT_SECRET: &[u8] = b"e2e-harness-secret";

/// Builds the full collaborator graph and router exactly as `main.rs` does,
/// then serves it on an OS-assigned port. `auth::test_support` is
/// `#[cfg(test)]`-gated inside the library crate and invisible from here, so
/// this harness signs its own tokens directly with `jsonwebtoken` below.
pub async fn start_server_with_config(config: ServerConfig) -> SocketAddr {
    let config = Arc::new(config);
    let ctx = Arc::new(HandlerContext {
        controller: Arc::new(InMemoryMediaController::new()),
        token_validator: Arc::new(JwtTokenValidator::new(JWT_SECRET)),
        events: Arc::new(EventManager::new(config.event_queue_capacity)),
        metrics: Arc::new(Metrics::new()),
        connections: Arc::new(ConnectionRegistry::new()),
        config: config.clone(),
    });

    let registry = MethodRegistry::new();
    methods::register_all(&registry, ctx.clone()).await;

    let pipeline = Pipeline::with_handler_deadline(
        registry,
        RateLimiter::new(config.rate_limit.window, config.rate_limit.max_requests),
        ctx.metrics.clone(),
        config.ping_requires_auth,
        config.handler_deadline,
    );

    let state = AppState::new(pipeline, ctx);
    let router = camera_ws_server::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("test server error");
    });

    // Give the spawned accept loop a moment to start listening before the
    // first client dials in.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    addr
}

pub async fn start_server() -> SocketAddr {
    start_server_with_config(ServerConfig::default()).await
}

/// Signs a JWT against [`JWT_SECRET`] carrying `role`, valid for one hour.
#[derive(Serialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
}

pub fn sign_token(role: Role) -> String {
    let claims = Claims {
        sub: "e2e-user".to_owned(),
        role: role.as_str().to_owned(),
        exp: (Utc::now() + ChronoDuration::hours(1)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)).unwrap()
}

pub fn expired_token(role: Role) -> String {
    let claims = Claims {
        sub: "e2e-user".to_owned(),
        role: role.as_str().to_owned(),
        exp: (Utc::now() - ChronoDuration::hours(1)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)).unwrap()
}

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A thin JSON-RPC-aware wrapper over a raw WebSocket connection, grounded
/// in the teacher's `MockWsClient`.
pub struct RpcClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    next_id: i64,
}

impl RpcClient {
    pub async fn connect(addr: SocketAddr, path: &str) -> Self {
        let url = format!("ws://{addr}{path}");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await.expect("ws connect");
        let (write, read) = ws_stream.split();
        Self { write, read, next_id: 1 }
    }

    /// Sends a request and waits for the response sharing its id, skipping
    /// over any event notifications that arrive in between.
    pub async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(&request.to_string()).await;
        loop {
            let frame = self.recv_raw().await;
            if frame.get("id").and_then(Value::as_i64) == Some(id) {
                return frame;
            }
        }
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.write.send(Message::Text(text.to_owned().into())).await.expect("ws send");
    }

    /// Reads the next text frame as JSON, transparently handling ping/pong.
    pub async fn recv_raw(&mut self) -> Value {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).expect("valid json frame"),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => panic!("connection closed unexpectedly"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("websocket error: {e}"),
            }
        }
    }

    /// Waits for the next server-initiated notification (a frame with no
    /// `id`), skipping any stray responses.
    pub async fn recv_notification(&mut self) -> Value {
        loop {
            let frame = self.recv_raw().await;
            if frame.get("id").is_none() && frame.get("method").is_some() {
                return frame;
            }
        }
    }

    pub async fn close(&mut self) {
        let _ = self.write.send(Message::Close(None)).await;
    }
}
