//! Shared test fixtures.
//!
//! `TestServer` is an in-process backend serving the demo routes: `GET /`,
//! `GET|POST /message`, and an echoing `/ws`. It binds `127.0.0.1:0` so tests
//! never collide. `MockSocket` and `MockApi` record calls for controller tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::error::{ClientError, SendError};
use crate::http::{MessageApi, MessageBody};
use crate::live::LiveFormat;
use crate::socket::{ReadyState, SocketHandle};

// =============================================================================
// MOCK SOCKET
// =============================================================================

#[derive(Debug, Default)]
pub struct SocketRecord {
    pub sent: Vec<String>,
    pub close_calls: usize,
}

/// Socket whose ready state is set by the test; records sends and closes.
pub struct MockSocket {
    pub state: Arc<Mutex<ReadyState>>,
    pub record: Arc<Mutex<SocketRecord>>,
}

impl MockSocket {
    pub fn new(state: ReadyState) -> Self {
        Self { state: Arc::new(Mutex::new(state)), record: Arc::new(Mutex::new(SocketRecord::default())) }
    }

    pub fn set_state(&self, state: ReadyState) {
        *self.state.lock().expect("state mutex") = state;
    }

    pub fn sent(&self) -> Vec<String> {
        self.record.lock().expect("record mutex").sent.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.record.lock().expect("record mutex").close_calls
    }

    /// A second handle onto the same shared state, for the controller to own.
    pub fn share(&self) -> Self {
        Self { state: self.state.clone(), record: self.record.clone() }
    }
}

impl SocketHandle for MockSocket {
    fn ready_state(&self) -> ReadyState {
        *self.state.lock().expect("state mutex")
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        if self.ready_state() != ReadyState::Open {
            return Err(SendError::NotOpen);
        }
        self.record.lock().expect("record mutex").sent.push(text.to_owned());
        Ok(())
    }

    fn close(&mut self) {
        self.record.lock().expect("record mutex").close_calls += 1;
        self.set_state(ReadyState::Closed);
    }
}

// =============================================================================
// MOCK HTTP
// =============================================================================

/// `MessageApi` that stores posts and answers reads with a fixed body.
#[derive(Default)]
pub struct MockApi {
    pub posts: Mutex<Vec<String>>,
    pub gets: Mutex<usize>,
    pub get_text: String,
    pub fail_post: bool,
    pub fail_get: bool,
}

impl MockApi {
    pub fn returning(text: &str) -> Self {
        Self { get_text: text.to_owned(), ..Self::default() }
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().expect("posts mutex").clone()
    }

    pub fn gets(&self) -> usize {
        *self.gets.lock().expect("gets mutex")
    }
}

#[async_trait::async_trait]
impl MessageApi for MockApi {
    async fn post_message(&self, text: &str) -> Result<(), ClientError> {
        self.posts.lock().expect("posts mutex").push(text.to_owned());
        if self.fail_post {
            return Err(ClientError::Status { status: 500, body: "post failed".into() });
        }
        Ok(())
    }

    async fn get_message(&self) -> Result<MessageBody, ClientError> {
        *self.gets.lock().expect("gets mutex") += 1;
        if self.fail_get {
            return Err(ClientError::Status { status: 503, body: "get failed".into() });
        }
        Ok(MessageBody { text: self.get_text.clone() })
    }
}

// =============================================================================
// TEST SERVER
// =============================================================================

/// How `/ws` answers each inbound text frame.
#[derive(Clone, Copy, Debug)]
pub enum EchoMode {
    /// Send the text back unchanged.
    Plain,
    /// Send `{"timestamp": "t<n>", "transformed": <upper-cased text>}`.
    Json,
    /// Send the text back, then a frame that is not valid JSON.
    JsonThenGarbage,
    /// Close immediately after the upgrade.
    CloseOnConnect,
}

#[derive(Clone)]
struct TestBackend {
    latest: Arc<Mutex<String>>,
    mode: EchoMode,
}

pub struct TestServer {
    pub addr: SocketAddr,
    latest: Arc<Mutex<String>>,
}

impl TestServer {
    pub async fn spawn(mode: EchoMode) -> Self {
        let latest = Arc::new(Mutex::new(String::new()));
        let backend = TestBackend { latest: latest.clone(), mode };
        let app = Router::new()
            .route("/", get(root))
            .route("/message", get(get_message).post(post_message))
            .route("/ws", get(ws_upgrade))
            .with_state(backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });
        Self { addr, latest }
    }

    pub fn config(&self, format: LiveFormat) -> ClientConfig {
        ClientConfig::new(&self.addr.ip().to_string(), self.addr.port(), format, 2).expect("valid test config")
    }

    pub fn latest(&self) -> String {
        self.latest.lock().expect("latest mutex").clone()
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "test backend running" }))
}

async fn get_message(State(backend): State<TestBackend>) -> Json<Value> {
    let text = backend.latest.lock().expect("latest mutex").clone();
    Json(json!({ "text": text }))
}

async fn post_message(State(backend): State<TestBackend>, Json(body): Json<Value>) -> Json<Value> {
    let text = body.get("text").and_then(Value::as_str).unwrap_or_default().to_owned();
    *backend.latest.lock().expect("latest mutex") = text;
    Json(json!({ "status": "ok" }))
}

async fn ws_upgrade(State(backend): State<TestBackend>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_echo(socket, backend))
}

async fn run_echo(mut socket: WebSocket, backend: TestBackend) {
    if matches!(backend.mode, EchoMode::CloseOnConnect) {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let mut counter = 0_u32;
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };
        let text = text.as_str().to_owned();
        *backend.latest.lock().expect("latest mutex") = text.clone();
        counter += 1;

        let replies = match backend.mode {
            EchoMode::Plain => vec![text],
            EchoMode::Json => {
                vec![json!({ "timestamp": format!("t{counter}"), "transformed": text.to_uppercase() }).to_string()]
            }
            EchoMode::JsonThenGarbage => vec![
                json!({ "timestamp": format!("t{counter}"), "transformed": text.to_uppercase() }).to_string(),
                "not json".to_owned(),
            ],
            EchoMode::CloseOnConnect => Vec::new(),
        };
        for reply in replies {
            if socket.send(Message::Text(reply.into())).await.is_err() {
                return;
            }
        }
    }
}
