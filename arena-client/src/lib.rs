//! # Arena Viewer Client (arena-client)
//!
//! Viewer-side counterpart of the real-time channel: a typed client over a
//! pluggable transport, one centralized reconnection policy, and the
//! reconciliation logic that merges optimistic local state with the
//! authoritative snapshots and deltas pushed by the server.

pub mod client;
pub mod reconciliation;
pub mod transport;

pub use client::{ChannelClient, RECONNECT_DELAY};
pub use reconciliation::{MatchView, ReconciliationClient};
pub use transport::{ChannelTransport, MessageStream, SseTransport};
