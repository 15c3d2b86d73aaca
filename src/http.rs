//! HTTP channel: explicit write-then-read against `/message`.
//!
//! The write and the read are two independent requests with no correlation
//! id. The value read back is whatever the backend holds at that moment, which
//! may have come from another writer.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::state::HttpValue;

/// Body of both `POST /message` and `GET /message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub text: String,
}

/// The two requests of the HTTP channel.
#[async_trait::async_trait]
pub trait MessageApi: Send + Sync {
    /// Store `text` as the latest message. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn post_message(&self, text: &str) -> Result<(), ClientError>;

    /// Fetch the latest stored message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a body
    /// that is not `{"text": string}`.
    async fn get_message(&self) -> Result<MessageBody, ClientError>;
}

/// `reqwest`-backed [`MessageApi`].
pub struct HttpMessageClient {
    client: reqwest::Client,
    message_url: String,
    root_url: String,
}

impl HttpMessageClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        // Talks to the same host as the socket, which never goes through a proxy.
        let client = reqwest::Client::builder().connect_timeout(config.connect_timeout).no_proxy().build()?;
        Ok(Self { client, message_url: config.message_url(), root_url: config.root_url() })
    }

    /// `GET /`, the backend's liveness/info endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// non-JSON body.
    pub async fn ping(&self) -> Result<Value, ClientError> {
        let response = self.client.get(&self.root_url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait::async_trait]
impl MessageApi for HttpMessageClient {
    async fn post_message(&self, text: &str) -> Result<(), ClientError> {
        let body = MessageBody { text: text.to_owned() };
        let response = self.client.post(&self.message_url).json(&body).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn get_message(&self) -> Result<MessageBody, ClientError> {
        let response = self.client.get(&self.message_url).send().await?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status: status.as_u16(), body })
}

/// Write `text`, then read back the latest value.
///
/// `sent_at` is the caller's local clock at the moment of the trigger; it is
/// stored as the value's timestamp regardless of how long the requests take.
///
/// # Errors
///
/// Propagates the first failing request. The read is not attempted if the
/// write fails.
pub async fn round_trip(api: &dyn MessageApi, text: &str, sent_at: OffsetDateTime) -> Result<HttpValue, ClientError> {
    api.post_message(text).await?;
    let body = api.get_message().await?;
    debug!(sent = text.len(), read = body.text.len(), "http: round trip complete");
    Ok(HttpValue { text: body.text, timestamp: sent_at })
}
