//! Typed channel client with the centralized reconnection policy
//!
//! On unexpected closure the client reconnects after a fixed delay,
//! indefinitely, until explicit teardown. The policy lives here and
//! nowhere else - no per-screen reconnect timers. Every received message
//! goes through a single handler; consistency after a reconnect comes
//! entirely from the fresh `initial` snapshot.

use arena_common::events::ChannelMessage;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::transport::ChannelTransport;

/// Fixed delay between reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Channel client driving one subscription at a time
pub struct ChannelClient {
    transport: Arc<dyn ChannelTransport>,
    retry_delay: Duration,
}

impl ChannelClient {
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        Self {
            transport,
            retry_delay: RECONNECT_DELAY,
        }
    }

    /// Override the reconnect delay (tests)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Watch a match until teardown
    ///
    /// Dispatches every message through `handler`. Returns when the
    /// teardown watch flips to true or its sender is dropped.
    pub async fn run<F>(&self, match_id: Uuid, mut teardown: watch::Receiver<bool>, mut handler: F)
    where
        F: FnMut(ChannelMessage) + Send,
    {
        loop {
            if *teardown.borrow() {
                return;
            }

            match self.transport.connect(match_id).await {
                Ok(mut stream) => {
                    info!("Channel connected for match {}", match_id);
                    loop {
                        tokio::select! {
                            changed = teardown.changed() => {
                                if changed.is_err() || *teardown.borrow() {
                                    info!("Channel teardown for match {}", match_id);
                                    return;
                                }
                            }
                            item = stream.next() => match item {
                                Some(Ok(message)) => {
                                    debug!("Channel message: {}", message.event_type());
                                    handler(message);
                                }
                                Some(Err(e)) => {
                                    warn!("Channel error for match {}: {}", match_id, e);
                                    break;
                                }
                                None => {
                                    warn!("Channel closed for match {}", match_id);
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Channel connect failed for match {}: {}", match_id, e);
                }
            }

            // Fixed-delay retry until teardown
            tokio::select! {
                changed = teardown.changed() => {
                    if changed.is_err() || *teardown.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }
}
