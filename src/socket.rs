//! WebSocket handle: one connection, owned by one controller.
//!
//! DESIGN
//! ======
//! `WsConnection::open` spawns a connection task and returns immediately with
//! an owned handle plus an event receiver. The handle is a command sender and
//! a shared ready state; the task owns the `tokio-tungstenite` stream.
//!
//! LIFECYCLE
//! =========
//! 1. Spawn → ready state `Connecting`
//! 2. Handshake ok → `Open`, emit `Opened`
//! 3. Inbound text/binary → emit `Text`/`Binary` in transport order
//! 4. Transport error → emit `Error`, then `Closed`
//! 5. `close()` or peer close → `Closed`, emit `Closed`, task exits
//!
//! There is no reconnect. A closed handle stays closed.

#[cfg(test)]
#[path = "socket_test.rs"]
mod socket_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{ClientError, SendError};

// =============================================================================
// READY STATE
// =============================================================================

const WS_CONNECTING: u8 = 0;
const WS_OPEN: u8 = 1;
const WS_CLOSING: u8 = 2;
const WS_CLOSED: u8 = 3;

/// Transport-level socket state, mirroring the browser `readyState` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            WS_CONNECTING => Self::Connecting,
            WS_OPEN => Self::Open,
            WS_CLOSING => Self::Closing,
            _ => Self::Closed,
        }
    }
}

// =============================================================================
// EVENTS & HANDLE TRAIT
// =============================================================================

/// Lifecycle and data events delivered to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Text(String),
    Binary(Vec<u8>),
    Error(String),
    Closed,
}

/// The operations a controller needs from its socket.
///
/// Implemented by [`WsConnection`] and by recording mocks in tests.
pub trait SocketHandle: Send {
    fn ready_state(&self) -> ReadyState;

    /// Queue one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotOpen`] unless the socket is open; nothing is
    /// queued for later in that case.
    fn send_text(&self, text: &str) -> Result<(), SendError>;

    /// Begin closing. Calling it again is a no-op.
    fn close(&mut self);
}

// =============================================================================
// CONNECTION
// =============================================================================

enum Command {
    Send(String),
    Close,
}

/// A live `tokio-tungstenite` connection running on its own task.
pub struct WsConnection {
    commands: mpsc::UnboundedSender<Command>,
    ready_state: Arc<AtomicU8>,
    close_requested: bool,
}

impl WsConnection {
    /// Start connecting to `url`. Must be called from within a tokio runtime.
    ///
    /// The handshake is bounded by `connect_timeout`; expiry is reported as an
    /// `Error` event followed by `Closed`.
    #[must_use]
    pub fn open(url: String, connect_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let ready_state = Arc::new(AtomicU8::new(WS_CONNECTING));

        tokio::spawn(run_connection(url, connect_timeout, ready_state.clone(), command_rx, event_tx));

        let conn = Self { commands: command_tx, ready_state, close_requested: false };
        (conn, event_rx)
    }
}

impl SocketHandle for WsConnection {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready_state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        if self.close_requested || self.ready_state() != ReadyState::Open {
            return Err(SendError::NotOpen);
        }
        self.commands.send(Command::Send(text.to_owned())).map_err(|_| SendError::ChannelClosed)
    }

    fn close(&mut self) {
        if self.close_requested {
            return;
        }
        self.close_requested = true;
        let _ = self
            .ready_state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| (raw < WS_CLOSING).then_some(WS_CLOSING));
        let _ = self.commands.send(Command::Close);
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// CONNECTION TASK
// =============================================================================

async fn run_connection(
    url: String,
    connect_timeout: Duration,
    ready_state: Arc<AtomicU8>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let connect = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));

    // A close requested mid-handshake abandons the attempt.
    let outcome = tokio::select! {
        result = connect => Some(result),
        () = wait_for_close(&mut commands) => None,
    };

    let mut stream = match outcome {
        None => {
            info!(%url, "ws: closed before handshake completed");
            finish(&ready_state, &events);
            return;
        }
        Some(Ok(Ok((stream, _response)))) => stream,
        Some(Ok(Err(e))) => {
            let err = ClientError::WsConnect(Box::new(e));
            warn!(%url, error = %err, "ws: connection failed");
            let _ = events.send(SocketEvent::Error(err.to_string()));
            finish(&ready_state, &events);
            return;
        }
        Some(Err(_elapsed)) => {
            let err = ClientError::ConnectTimeout;
            warn!(%url, timeout = ?connect_timeout, "ws: connection timed out");
            let _ = events.send(SocketEvent::Error(err.to_string()));
            finish(&ready_state, &events);
            return;
        }
    };

    // Stays `Closing` if close() raced the handshake; the loop below then
    // picks up the queued `Close` straight away.
    let _ = ready_state.compare_exchange(WS_CONNECTING, WS_OPEN, Ordering::SeqCst, Ordering::SeqCst);
    info!(%url, "ws: connected");
    let _ = events.send(SocketEvent::Opened);

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Send(text)) => {
                    if let Err(e) = stream.send(Message::Text(text.into())).await {
                        warn!(error = %e, "ws: send failed");
                        let _ = events.send(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    ready_state.store(WS_CLOSING, Ordering::SeqCst);
                    if let Err(e) = stream.close(None).await {
                        debug!(error = %e, "ws: close handshake failed");
                    }
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!(len = text.len(), "ws: recv text");
                    let _ = events.send(SocketEvent::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    debug!(len = bytes.len(), "ws: recv binary");
                    let _ = events.send(SocketEvent::Binary(bytes.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "ws: transport error");
                    let _ = events.send(SocketEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    }

    info!(%url, "ws: closed");
    finish(&ready_state, &events);
}

/// Resolve once a `Close` command arrives or the handle is dropped. The handle
/// refuses sends before `Open`, so anything else here is stale and skipped.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<Command>) {
    loop {
        match commands.recv().await {
            Some(Command::Close) | None => return,
            Some(Command::Send(_)) => {}
        }
    }
}

fn finish(ready_state: &AtomicU8, events: &mpsc::UnboundedSender<SocketEvent>) {
    ready_state.store(WS_CLOSED, Ordering::SeqCst);
    let _ = events.send(SocketEvent::Closed);
}
