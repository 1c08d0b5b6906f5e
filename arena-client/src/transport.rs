//! Channel transport abstraction
//!
//! The persistent connection is a collaborator: the client logic only sees
//! a stream of typed messages, so tests can drive it with a scripted
//! transport and production uses the SSE transport below.

use arena_common::events::ChannelMessage;
use arena_common::{Error, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use uuid::Uuid;

/// Stream of channel messages from one connection
pub type MessageStream = BoxStream<'static, Result<ChannelMessage>>;

/// Persistent bidirectional connection collaborator
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Open a connection for one match and return its message stream
    ///
    /// The stream ends when the connection closes; reconnecting is the
    /// caller's policy, not the transport's.
    async fn connect(&self, match_id: Uuid) -> Result<MessageStream>;
}

/// SSE transport over the engine's `/matches/:id/events` endpoint
pub struct SseTransport {
    base_url: String,
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChannelTransport for SseTransport {
    async fn connect(&self, match_id: Uuid) -> Result<MessageStream> {
        let url = format!("{}/api/v1/matches/{}/events", self.base_url, match_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Channel connect failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Channel connect returned {}",
                response.status()
            )));
        }

        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer = String::new();
            let mut data = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk
                    .map_err(|e| Error::ExternalService(format!("Channel read failed: {}", e)))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);

                    if line.is_empty() {
                        // Blank line ends one SSE frame
                        if !data.is_empty() {
                            let message: ChannelMessage = serde_json::from_str(&data)
                                .map_err(|e| {
                                    Error::ExternalService(format!(
                                        "Invalid channel message: {}",
                                        e
                                    ))
                                })?;
                            data.clear();
                            yield message;
                        }
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(rest.trim_start());
                    }
                    // `event:` names duplicate the type tag and comment
                    // lines are keep-alives; both are ignored
                }
            }
        };

        Ok(stream.boxed())
    }
}
