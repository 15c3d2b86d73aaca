//! View state for one mounted visualizer.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plain data owned by the controller. Every field holds only the latest
//! value; nothing is queued, merged, or kept as history. The socket handle is
//! deliberately not in here: it lives on the controller so re-rendering never
//! touches it.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use time::OffsetDateTime;

use crate::live::LiveValue;

// =============================================================================
// CONNECTION STATUS
// =============================================================================

/// WebSocket lifecycle as shown next to the live panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Handshake in progress. Every mount starts here.
    #[default]
    Connecting,
    /// Socket is open; keystrokes are forwarded.
    Connected,
    /// Transport reported an error. Terminal apart from the follow-up close.
    Error,
    /// Socket closed, by either side. Terminal.
    Closed,
}

impl ConnectionStatus {
    /// Whether `self -> next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Connected | Self::Error | Self::Closed)
                | (Self::Connected, Self::Error | Self::Closed)
                | (Self::Error, Self::Closed)
        )
    }

    /// `true` once the channel can never deliver or send again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Closed)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Error => "Error",
            Self::Closed => "Closed",
        }
    }
}

// =============================================================================
// HTTP VALUE
// =============================================================================

/// Value read back from `GET /message`, stamped with the local time the write
/// was issued (not a server time).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpValue {
    pub text: String,
    pub timestamp: OffsetDateTime,
}

// =============================================================================
// VIEW STATE
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    /// What the user has typed so far. Source of truth for both channels.
    pub typed_text: String,
    /// Latest accepted socket payload.
    pub live_value: Option<LiveValue>,
    /// Latest HTTP round-trip result.
    pub http_value: Option<HttpValue>,
    pub connection_status: ConnectionStatus,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one typed character.
    pub fn push_char(&mut self, ch: char) {
        self.typed_text.push(ch);
    }

    /// Remove the last character. Returns `false` when there was nothing to
    /// remove.
    pub fn backspace(&mut self) -> bool {
        self.typed_text.pop().is_some()
    }

    /// Overwrite the live value. Last write wins.
    pub fn set_live_value(&mut self, value: LiveValue) {
        self.live_value = Some(value);
    }

    pub fn set_http_value(&mut self, value: HttpValue) {
        self.http_value = Some(value);
    }

    /// Apply a status change if the lifecycle allows it.
    ///
    /// Returns `true` when the status changed. Repeating the current status
    /// or stepping backwards is ignored.
    pub fn set_status(&mut self, next: ConnectionStatus) -> bool {
        if !self.connection_status.can_transition(next) {
            return false;
        }
        self.connection_status = next;
        true
    }
}
