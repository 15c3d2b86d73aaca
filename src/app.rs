//! The visualizer controller: one mounted "component".
//!
//! DESIGN
//! ======
//! `Visualizer` owns the view state, the socket handle, and the HTTP client.
//! Mounting opens the socket; unmounting (or dropping) closes it exactly once.
//! The handle sits in a field rather than in `ViewState` so state updates
//! never recreate or touch it.
//!
//! Every input is a discrete event handled to completion:
//! - input change → update typed text → forward over the socket if open
//! - socket event → status change or live value overwrite
//! - send trigger → HTTP write, HTTP read, overwrite HTTP value
//!
//! ERROR HANDLING
//! ==============
//! Skipped sends, undecodable frames, and failed HTTP calls are logged here
//! and returned to the caller as values. None of them touch state that was
//! already displayed.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, DecodeError, SendError};
use crate::http::{self, HttpMessageClient, MessageApi};
use crate::live::{LiveFormat, LiveValue};
use crate::socket::{SocketEvent, SocketHandle, WsConnection};
use crate::state::{ConnectionStatus, HttpValue, ViewState};

/// Source of the local timestamp attached to HTTP values.
pub type Clock = fn() -> OffsetDateTime;

pub struct Visualizer {
    state: ViewState,
    format: LiveFormat,
    socket: Option<Box<dyn SocketHandle>>,
    http: Arc<dyn MessageApi>,
    clock: Clock,
}

impl Visualizer {
    /// Assemble a mounted controller from an already-opening socket.
    #[must_use]
    pub fn new(format: LiveFormat, socket: Box<dyn SocketHandle>, http: Arc<dyn MessageApi>) -> Self {
        Self { state: ViewState::new(), format, socket: Some(socket), http, clock: OffsetDateTime::now_utc }
    }

    /// Open the socket and build the HTTP client for `config`.
    ///
    /// Returns the controller together with the socket's event stream, which
    /// the caller feeds back through [`Visualizer::handle_socket_event`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built. Socket failures
    /// arrive later as events.
    pub fn mount(config: &ClientConfig) -> Result<(Self, mpsc::UnboundedReceiver<SocketEvent>), ClientError> {
        let http = HttpMessageClient::new(config)?;
        let (conn, events) = WsConnection::open(config.ws_url(), config.connect_timeout);
        info!(ws = %config.ws_url(), http = %config.message_url(), format = ?config.format, "visualizer mounted");
        Ok((Self::new(config.format, Box::new(conn), Arc::new(http)), events))
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// The input's value changed to `text`. Forwards the full value over the
    /// socket when it is open.
    ///
    /// # Errors
    ///
    /// Returns the reason the value was not forwarded. Typed text is updated
    /// either way.
    pub fn input_changed(&mut self, text: String) -> Result<(), SendError> {
        self.state.typed_text = text;
        self.forward()
    }

    /// One keystroke appending `ch`.
    ///
    /// # Errors
    ///
    /// See [`Visualizer::input_changed`].
    pub fn type_char(&mut self, ch: char) -> Result<(), SendError> {
        self.state.push_char(ch);
        self.forward()
    }

    /// One backspace keystroke. Nothing is sent when the input was already
    /// empty, since the value did not change.
    ///
    /// # Errors
    ///
    /// See [`Visualizer::input_changed`].
    pub fn backspace(&mut self) -> Result<(), SendError> {
        if !self.state.backspace() {
            return Ok(());
        }
        self.forward()
    }

    fn forward(&self) -> Result<(), SendError> {
        let Some(socket) = self.socket.as_ref() else {
            warn!("ws: unmounted, keystroke not sent");
            return Err(SendError::NotOpen);
        };
        match socket.send_text(&self.state.typed_text) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "ws: not ready, keystroke not sent");
                Err(e)
            }
        }
    }

    // =========================================================================
    // SOCKET EVENTS
    // =========================================================================

    /// Apply one socket event. Returns `true` when visible state changed.
    pub fn handle_socket_event(&mut self, event: SocketEvent) -> bool {
        match event {
            SocketEvent::Opened => self.transition(ConnectionStatus::Connected),
            SocketEvent::Text(text) => {
                debug!(len = text.len(), "ws: message received");
                let decoded = self.format.decode(&text);
                self.accept(decoded)
            }
            SocketEvent::Binary(bytes) => {
                debug!(len = bytes.len(), "ws: binary message received");
                let decoded = self.format.decode_bytes(&bytes);
                self.accept(decoded)
            }
            SocketEvent::Error(message) => {
                error!(%message, "ws: error");
                self.transition(ConnectionStatus::Error)
            }
            SocketEvent::Closed => self.transition(ConnectionStatus::Closed),
        }
    }

    fn accept(&mut self, decoded: Result<LiveValue, DecodeError>) -> bool {
        match decoded {
            Ok(value) => {
                self.state.set_live_value(value);
                true
            }
            Err(e) => {
                warn!(error = %e, "ws: dropping undecodable message");
                false
            }
        }
    }

    fn transition(&mut self, next: ConnectionStatus) -> bool {
        let from = self.state.connection_status;
        if self.state.set_status(next) {
            info!(?from, to = ?next, "ws: status changed");
            true
        } else {
            debug!(?from, to = ?next, "ws: ignoring status change");
            false
        }
    }

    // =========================================================================
    // HTTP
    // =========================================================================

    /// Write the current text over HTTP, read back the latest value, and
    /// display it with the local time of this call.
    ///
    /// # Errors
    ///
    /// Returns the failing request's error; the displayed HTTP value is left
    /// as it was.
    pub async fn send_http(&mut self) -> Result<HttpValue, ClientError> {
        let sent_at = (self.clock)();
        let text = self.state.typed_text.clone();
        let api = Arc::clone(&self.http);
        match http::round_trip(api.as_ref(), &text, sent_at).await {
            Ok(value) => {
                info!(len = value.text.len(), "http: value refreshed");
                self.state.set_http_value(value.clone());
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, "http: send failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Close the socket. Later calls, and the eventual drop, do nothing.
    pub fn unmount(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            info!("visualizer unmounting");
            socket.close();
        }
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        self.unmount();
    }
}
