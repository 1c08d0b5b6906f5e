//! Internal completion events
//!
//! One completion event is emitted per terminal match transition
//! (completed or failed) and consumed by the ranking pipeline. These are
//! internal to the service; they are never serialized onto the viewer
//! channel. The viewer-visible messages live in
//! `arena_common::events::ChannelMessage`.

use arena_common::model::{CatalogScope, MatchStatus, PaperId};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Signal that a match reached a terminal state
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub match_id: Uuid,
    /// Completed or Failed; never an intermediate state
    pub status: MatchStatus,
    pub papers: Vec<PaperId>,
    pub scope: CatalogScope,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast bus for completion events
///
/// Uses tokio::broadcast internally: non-blocking publish, multiple
/// concurrent subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct CompletionBus {
    tx: broadcast::Sender<CompletionEvent>,
    capacity: usize,
}

impl CompletionBus {
    /// Create a new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future completion events
    pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: CompletionEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
