//! Live values carried by the WebSocket channel.
//!
//! Two peer flavours exist: one echoes the raw text back, the other answers
//! with a JSON object `{ "timestamp": ..., "transformed": ... }`. The format
//! is chosen up front; the decoder never guesses.

#[cfg(test)]
#[path = "live_test.rs"]
mod live_test;

use serde::Deserialize;

use crate::error::DecodeError;

/// How inbound socket frames are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LiveFormat {
    /// Frame text is the value.
    #[default]
    Plain,
    /// Frame text is JSON with `timestamp` and `transformed` fields.
    Echo,
}

/// Latest value received over the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveValue {
    /// Raw text from a plain echo peer.
    Text(String),
    /// Structured reply; both fields are supplied by the peer.
    Echo { timestamp: String, transformed: String },
}

#[derive(Deserialize)]
struct EchoPayload {
    timestamp: String,
    transformed: String,
}

impl LiveFormat {
    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidJson`] when the echo format is selected
    /// and the frame is not an object with string `timestamp` and
    /// `transformed` fields. Extra fields are ignored.
    pub fn decode(self, text: &str) -> Result<LiveValue, DecodeError> {
        match self {
            Self::Plain => Ok(LiveValue::Text(text.to_owned())),
            Self::Echo => {
                let payload: EchoPayload = serde_json::from_str(text)?;
                Ok(LiveValue::Echo { timestamp: payload.timestamp, transformed: payload.transformed })
            }
        }
    }

    /// Decode a binary frame by first requiring valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidUtf8`] for non-UTF-8 bytes, otherwise
    /// whatever [`LiveFormat::decode`] returns.
    pub fn decode_bytes(self, bytes: &[u8]) -> Result<LiveValue, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        self.decode(text)
    }
}
