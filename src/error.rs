//! Error types for both update channels.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here is retried. Callers either propagate a `ClientError` (one-shot
//! commands) or log it and leave view state untouched (interactive session).
//! Socket sends and inbound decoding have their own small enums so the silent
//! paths of a browser client become explicit values.

/// Errors produced by HTTP requests, socket setup, and the terminal front-end.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("timed out connecting websocket")]
    ConnectTimeout,
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a keystroke was not forwarded over the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The socket has not opened yet, or has already errored/closed.
    #[error("websocket not open")]
    NotOpen,
    /// The connection task is gone.
    #[error("websocket task has exited")]
    ChannelClosed,
}

/// Why an inbound socket frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("binary frame is not UTF-8")]
    InvalidUtf8,
}
