//! Shared test infrastructure: scripted agent runners and engine setup
#![allow(dead_code)]

use arena_common::model::MatchSpec;
use arena_common::{Error, Result};
use arena_server::db::init::init_memory_database;
use arena_server::orchestrator::{AgentRunner, RunReport, RunRequest};
use arena_server::AppState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// What the scripted runner should do for each run
pub enum RunnerScript {
    /// Report the given judge score per paper
    Scores(BTreeMap<String, f64>),
    /// Simulate a reviewer service outage
    Outage,
}

/// Agent runner double with a gate for deterministic completion timing
///
/// A gated runner blocks every run until `release` grants it a permit, so
/// tests can subscribe to the channel before the match resolves.
pub struct GatedRunner {
    gate: Semaphore,
    script: RunnerScript,
}

impl GatedRunner {
    /// Runner that completes immediately
    pub fn released(script: RunnerScript) -> Self {
        Self {
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
            script,
        }
    }

    /// Runner that blocks until released
    pub fn gated(script: RunnerScript) -> Self {
        Self {
            gate: Semaphore::new(0),
            script,
        }
    }

    /// Allow `n` pending or future runs to proceed
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl AgentRunner for GatedRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::Internal("runner gate closed".to_string()))?;
        permit.forget();

        match &self.script {
            RunnerScript::Outage => Err(Error::ExternalService(
                "reviewer service offline".to_string(),
            )),
            RunnerScript::Scores(scores) => {
                let mut paper_scores = BTreeMap::new();
                for paper in &request.papers {
                    paper_scores.insert(paper.clone(), scores.get(paper).copied().unwrap_or(0.0));
                }
                Ok(RunReport {
                    reviews: vec![],
                    paper_scores,
                    summary: "scripted evaluation".to_string(),
                })
            }
        }
    }
}

/// Build a score script from (paper, score) pairs
pub fn scores(pairs: &[(&str, f64)]) -> RunnerScript {
    RunnerScript::Scores(
        pairs
            .iter()
            .map(|(paper, score)| (paper.to_string(), *score))
            .collect(),
    )
}

/// Spin up the full engine over an in-memory database
pub async fn engine(runner: Arc<dyn AgentRunner>) -> AppState {
    let pool = init_memory_database().await.expect("init database");
    let (state, _pipeline) = AppState::initialize(pool, runner, 0)
        .await
        .expect("initialize engine");
    state
}

/// Comparison-mode spec over two papers in the cs/ai/2024 scope
pub fn comparison_spec(paper1: &str, paper2: &str) -> MatchSpec {
    MatchSpec {
        agent1_id: Uuid::new_v4(),
        agent2_id: Uuid::new_v4(),
        judge_id: Uuid::new_v4(),
        paper_id: None,
        paper1_id: Some(paper1.to_string()),
        paper2_id: Some(paper2.to_string()),
        category: "cs".to_string(),
        subcategory: "ai".to_string(),
        year: 2024,
    }
}
