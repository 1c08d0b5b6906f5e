//! Completion pipeline
//!
//! Bridges match completions into ranking recomputation and performance
//! broadcasts: one task subscribed to the completion bus, driving the
//! aggregator and the channel in order. Failed matches flow through here
//! too - their placeholder outcomes contribute nothing to the rankings,
//! but the recompute and broadcast still fire so viewers are never left
//! waiting on a reviewer outage.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::RealtimeChannel;
use crate::events::CompletionEvent;
use crate::orchestrator::MatchOrchestrator;
use crate::ranking::RankingAggregator;

/// Recompute rankings for one completion and broadcast the fallout
pub async fn handle_completion(
    orchestrator: &MatchOrchestrator,
    ranking: &RankingAggregator,
    channel: &RealtimeChannel,
    event: &CompletionEvent,
) {
    let completed = orchestrator.completed_matches().await;
    ranking.recompute(&completed).await;
    channel.publish_performance(&event.papers).await;
}

/// Spawn the completion consumer task
///
/// Runs until the completion bus closes (all senders dropped).
pub fn spawn_completion_pipeline(
    orchestrator: Arc<MatchOrchestrator>,
    ranking: Arc<RankingAggregator>,
    channel: Arc<RealtimeChannel>,
    mut rx: broadcast::Receiver<CompletionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    handle_completion(&orchestrator, &ranking, &channel, &event).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Rankings are a full recompute, so a lagged receiver
                    // only delays broadcasts; the next event catches up
                    warn!("Completion pipeline lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Completion bus closed, pipeline shutting down");
                    break;
                }
            }
        }
    })
}
