//! Client configuration and endpoint derivation.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ClientError;
use crate::live::LiveFormat;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const WS_PATH: &str = "/ws";
pub const MESSAGE_PATH: &str = "/message";

/// Typed client configuration, built from CLI flags and their env fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub format: LiveFormat,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Validate a host/port pair into a config.
    ///
    /// The host must be a bare host name or address: no scheme, path, or
    /// embedded port.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] for an empty or malformed host.
    pub fn new(host: &str, port: u16, format: LiveFormat, connect_timeout_secs: u64) -> Result<Self, ClientError> {
        let host = host.trim();
        if host.is_empty() || host.contains("://") || host.contains('/') || host.contains(char::is_whitespace) {
            return Err(ClientError::InvalidBaseUrl(host.to_owned()));
        }
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(ClientError::InvalidBaseUrl(host.to_owned()));
        }
        if port == 0 {
            return Err(ClientError::InvalidBaseUrl(format!("{host}:0")));
        }
        Ok(Self {
            host: host.to_owned(),
            port,
            format,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// `http://<host>:<port>` with no trailing slash.
    #[must_use]
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Streaming endpoint, `ws://<host>:<port>/ws`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}{WS_PATH}", self.host, self.port)
    }

    /// Request/response endpoint, `http://<host>:<port>/message`.
    #[must_use]
    pub fn message_url(&self) -> String {
        format!("{}{MESSAGE_PATH}", self.http_base())
    }

    /// Backend info endpoint, `http://<host>:<port>/`.
    #[must_use]
    pub fn root_url(&self) -> String {
        format!("{}/", self.http_base())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            format: LiveFormat::Plain,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}
