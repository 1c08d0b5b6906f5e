//! Shared application state
//!
//! Explicitly constructed service instances, injected into consumers via
//! axum state; no ambient singletons.

use arena_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::channel::RealtimeChannel;
use crate::events::CompletionBus;
use crate::feedback::FeedbackStore;
use crate::orchestrator::{AgentRunner, MatchOrchestrator};
use crate::pipeline::spawn_completion_pipeline;
use crate::ranking::RankingAggregator;

/// Completion bus capacity; a full recompute per event makes lag harmless
const COMPLETION_BUS_CAPACITY: usize = 64;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub feedback: Arc<FeedbackStore>,
    pub orchestrator: Arc<MatchOrchestrator>,
    pub ranking: Arc<RankingAggregator>,
    pub channel: Arc<RealtimeChannel>,
    pub completions: CompletionBus,
    pub pool: SqlitePool,
    pub port: u16,
}

impl AppState {
    /// Wire up all engine components over an initialized pool
    ///
    /// Hydrates existing matches and feedback, seeds the rankings from the
    /// persisted outcome set, and spawns the completion pipeline. Returns
    /// the state plus the pipeline task handle.
    pub async fn initialize(
        pool: SqlitePool,
        runner: Arc<dyn AgentRunner>,
        port: u16,
    ) -> Result<(Self, JoinHandle<()>)> {
        let completions = CompletionBus::new(COMPLETION_BUS_CAPACITY);
        let pipeline_rx = completions.subscribe();

        let orchestrator = Arc::new(MatchOrchestrator::new(
            pool.clone(),
            runner,
            completions.clone(),
        ));
        let match_ids = orchestrator.load().await?;

        let feedback = Arc::new(FeedbackStore::new(pool.clone()));
        feedback.hydrate(&match_ids).await?;

        let ranking = Arc::new(RankingAggregator::new());
        ranking
            .recompute(&orchestrator.completed_matches().await)
            .await;

        let channel = Arc::new(RealtimeChannel::new(
            Arc::clone(&feedback),
            Arc::clone(&ranking),
        ));

        let pipeline = spawn_completion_pipeline(
            Arc::clone(&orchestrator),
            Arc::clone(&ranking),
            Arc::clone(&channel),
            pipeline_rx,
        );

        info!("Engine state initialized ({} matches)", match_ids.len());

        Ok((
            Self {
                feedback,
                orchestrator,
                ranking,
                channel,
                completions,
                pool,
                port,
            },
            pipeline,
        ))
    }
}
