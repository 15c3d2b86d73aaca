//! Panel rendering. A pure function of [`ViewState`]: no history, no diffing.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::fmt::Write;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::live::LiveValue;
use crate::state::{HttpValue, ViewState};

pub const TITLE: &str = "Real-time Typing Visualizer";
pub const INPUT_PLACEHOLDER: &str = "Start typing...";
pub const HTTP_WAITING: &str = "waiting for :send";
pub const LIVE_WAITING: &str = "waiting for messages";

/// Render the whole screen: title, input line, HTTP panel, WebSocket panel.
#[must_use]
pub fn render(state: &ViewState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {TITLE} ==");
    let _ = writeln!(out, "> {}", input_line(&state.typed_text));
    let _ = writeln!(out, "-- HTTP (manual) --");
    let _ = writeln!(out, "{}", http_panel(state.http_value.as_ref()));
    let _ = writeln!(out, "-- WebSocket (live): {} --", state.connection_status.label());
    let _ = writeln!(out, "{}", live_panel(state.live_value.as_ref()));
    out
}

fn input_line(text: &str) -> &str {
    if text.is_empty() { INPUT_PLACEHOLDER } else { text }
}

#[must_use]
pub fn http_panel(value: Option<&HttpValue>) -> String {
    match value {
        None => HTTP_WAITING.to_owned(),
        Some(v) => format!("[{}] {}", format_timestamp(v.timestamp), v.text),
    }
}

#[must_use]
pub fn live_panel(value: Option<&LiveValue>) -> String {
    match value {
        None => LIVE_WAITING.to_owned(),
        Some(LiveValue::Text(text)) => text.clone(),
        Some(LiveValue::Echo { timestamp, transformed }) => format!("[{timestamp}] {transformed}"),
    }
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.unix_timestamp().to_string())
}
