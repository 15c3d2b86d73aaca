//! Line-oriented terminal front-end for a mounted [`Visualizer`].
//!
//! Each input line is typed one character at a time, so every character is a
//! separate keystroke and a separate socket send. Lines starting with `:` are
//! commands; `::` types a literal leading colon.

#[cfg(test)]
#[path = "terminal_test.rs"]
mod terminal_test;

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::Visualizer;
use crate::error::ClientError;
use crate::render::render;
use crate::socket::SocketEvent;

pub const HELP: &str = "type text to send it keystroke by keystroke; \
commands: :send (HTTP) :back (backspace) :clear :status :help :quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Type(String),
    Send,
    Backspace,
    Clear,
    Status,
    Help,
    Quit,
    Unknown(String),
}

#[must_use]
pub fn parse_line(line: &str) -> Action {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("::") {
        return Action::Type(format!(":{rest}"));
    }
    let Some(command) = line.strip_prefix(':') else {
        return Action::Type(line.to_owned());
    };
    match command.trim() {
        "send" | "s" => Action::Send,
        "back" | "b" => Action::Backspace,
        "clear" | "c" => Action::Clear,
        "status" => Action::Status,
        "help" | "h" | "?" => Action::Help,
        "quit" | "q" => Action::Quit,
        other => Action::Unknown(other.to_owned()),
    }
}

/// Run until `:quit` or end of input. Socket events are applied as they
/// arrive and the screen is redrawn after each visible change.
///
/// Does not unmount; the caller does that so teardown also happens when this
/// future is dropped early.
///
/// # Errors
///
/// Returns an error only when reading input or writing output fails. HTTP
/// failures are printed and the session continues.
pub async fn run_session<R, W>(
    vis: &mut Visualizer,
    events: &mut mpsc::UnboundedReceiver<SocketEvent>,
    input: R,
    out: &mut W,
) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut events_open = true;
    draw(vis, out)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("terminal: end of input");
                    break;
                };
                if !apply_action(vis, parse_line(&line), out).await? {
                    break;
                }
            }
            event = events.recv(), if events_open => {
                match event {
                    Some(event) => {
                        if vis.handle_socket_event(event) {
                            draw(vis, out)?;
                        }
                    }
                    None => events_open = false,
                }
            }
        }
    }
    Ok(())
}

/// Returns `false` when the session should end.
async fn apply_action<W: Write>(vis: &mut Visualizer, action: Action, out: &mut W) -> Result<bool, ClientError> {
    match action {
        Action::Type(text) => {
            for ch in text.chars() {
                // A skipped send is already logged by the controller.
                let _ = vis.type_char(ch);
            }
        }
        Action::Backspace => {
            let _ = vis.backspace();
        }
        Action::Clear => {
            let _ = vis.input_changed(String::new());
        }
        Action::Send => {
            if let Err(e) = vis.send_http().await {
                writeln!(out, "http send failed: {e}")?;
            }
        }
        Action::Status => {
            writeln!(out, "status: {}", vis.state().connection_status.label())?;
            return Ok(true);
        }
        Action::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(true);
        }
        Action::Unknown(command) => {
            writeln!(out, "unknown command :{command} ({HELP})")?;
            return Ok(true);
        }
        Action::Quit => return Ok(false),
    }
    draw(vis, out)?;
    Ok(true)
}

fn draw<W: Write>(vis: &Visualizer, out: &mut W) -> Result<(), ClientError> {
    write!(out, "{}", render(vis.state()))?;
    out.flush()?;
    Ok(())
}

/// Unmount and keep applying socket events until the close is observed or
/// `grace` elapses, then draw the final screen.
///
/// # Errors
///
/// Returns an error if writing the final screen fails.
pub async fn shutdown<W: Write>(
    vis: &mut Visualizer,
    events: &mut mpsc::UnboundedReceiver<SocketEvent>,
    grace: Duration,
    out: &mut W,
) -> Result<(), ClientError> {
    vis.unmount();
    let drained = tokio::time::timeout(grace, async {
        while !vis.state().connection_status.is_terminal() {
            let Some(event) = events.recv().await else { break };
            vis.handle_socket_event(event);
        }
    })
    .await;
    if drained.is_err() {
        info!(?grace, "terminal: close not confirmed before exit");
    }
    draw(vis, out)
}
