//! Match lifecycle state machine
//!
//! Transitions: pending -> in_progress -> completed | failed. No transition
//! skips in_progress and terminal states are final. The orchestrator is the
//! only mutator of match records; waiting on the agent runner happens on a
//! spawned task so other matches never block.

mod runner;

pub use runner::{AgentRunner, HttpAgentRunner, RunReport, RunRequest};

use arena_common::model::{
    CatalogScope, Match, MatchOutcome, MatchSpec, MatchStatus, PaperId, Review,
};
use arena_common::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{CompletionBus, CompletionEvent};

/// Review text recorded when the reviewer service was unreachable
const PLACEHOLDER_REVIEW: &str =
    "Automated review unavailable: the reviewer service could not be reached. \
     This is a placeholder result.";

/// Match lifecycle owner
pub struct MatchOrchestrator {
    pool: SqlitePool,
    matches: RwLock<HashMap<Uuid, Match>>,
    runner: Arc<dyn AgentRunner>,
    completions: CompletionBus,
}

impl MatchOrchestrator {
    pub fn new(pool: SqlitePool, runner: Arc<dyn AgentRunner>, completions: CompletionBus) -> Self {
        Self {
            pool,
            matches: RwLock::new(HashMap::new()),
            runner,
            completions,
        }
    }

    /// Load existing match records from the database
    pub async fn load(&self) -> Result<Vec<Uuid>> {
        let records = crate::db::matches::load_matches(&self.pool).await?;
        let mut matches = self.matches.write().await;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if !record.status.is_terminal() {
                warn!(
                    "Match {} was left {} by a previous run",
                    record.id, record.status
                );
            }
            ids.push(record.id);
            matches.insert(record.id, record);
        }
        info!("Loaded {} match records", ids.len());
        Ok(ids)
    }

    /// Create a match and start running it
    ///
    /// Validates the spec, records the match as pending, transitions it to
    /// in_progress and hands it to the agent runner on a spawned task. The
    /// returned record is the in_progress state. A rejected spec produces
    /// no match record and no completion event.
    pub async fn create(self: Arc<Self>, spec: MatchSpec) -> Result<Match> {
        let papers = validate_spec(&spec)?;

        let now = Utc::now();
        let mut record = Match {
            id: Uuid::new_v4(),
            status: MatchStatus::Pending,
            agent1_id: spec.agent1_id,
            agent2_id: spec.agent2_id,
            judge_id: spec.judge_id,
            papers,
            scope: CatalogScope {
                category: spec.category,
                subcategory: spec.subcategory,
                year: spec.year,
            },
            outcome: None,
            created_at: now,
            completed_at: None,
        };

        crate::db::matches::upsert_match(&self.pool, &record).await?;

        // pending -> in_progress happens immediately; the pending state
        // exists so no transition ever skips it
        record.status = MatchStatus::InProgress;
        crate::db::matches::upsert_match(&self.pool, &record).await?;

        {
            let mut matches = self.matches.write().await;
            matches.insert(record.id, record.clone());
        }

        info!("Match {} created, invoking agent runner", record.id);

        let orchestrator = Arc::clone(&self);
        let match_id = record.id;
        tokio::spawn(async move {
            orchestrator.run_match(match_id).await;
        });

        Ok(record)
    }

    /// Get a match record by id
    pub async fn get(&self, match_id: Uuid) -> Result<Match> {
        let matches = self.matches.read().await;
        matches
            .get(&match_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Match {} not found", match_id)))
    }

    /// List matches, optionally filtered by status, newest first
    pub async fn list(&self, status: Option<MatchStatus>) -> Vec<Match> {
        let matches = self.matches.read().await;
        let mut result: Vec<Match> = matches
            .values()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        result
    }

    /// Snapshot of all completed matches (ranking recompute input)
    pub async fn completed_matches(&self) -> Vec<Match> {
        self.list(Some(MatchStatus::Completed)).await
    }

    /// Drive one match through the agent runner to a terminal state
    async fn run_match(self: Arc<Self>, match_id: Uuid) {
        let record = match self.get(match_id).await {
            Ok(record) => record,
            Err(_) => {
                error!("Match {} vanished before the runner started", match_id);
                return;
            }
        };

        let request = RunRequest {
            match_id,
            agent1_id: record.agent1_id,
            agent2_id: record.agent2_id,
            judge_id: record.judge_id,
            papers: record.papers.clone(),
        };

        match self.runner.run(&request).await {
            Ok(report) => {
                let outcome = resolve_outcome(&record.papers, report);
                self.finish(match_id, MatchStatus::Completed, outcome).await;
            }
            Err(e) => {
                // Deliberate resilience policy: a reviewer outage resolves
                // the match instead of leaving it in_progress forever, so
                // the ranking and feedback pipeline downstream never stalls
                warn!(
                    "Agent runner failed for match {}: {}; recording placeholder outcome",
                    match_id, e
                );
                let outcome = placeholder_outcome(&record);
                self.finish(match_id, MatchStatus::Failed, outcome).await;
            }
        }
    }

    /// Apply a terminal transition and emit exactly one completion event
    async fn finish(&self, match_id: Uuid, status: MatchStatus, outcome: MatchOutcome) {
        let record = {
            let mut matches = self.matches.write().await;
            let Some(record) = matches.get_mut(&match_id) else {
                error!("Match {} vanished before completion", match_id);
                return;
            };
            record.status = status;
            record.outcome = Some(outcome);
            record.completed_at = Some(Utc::now());
            record.clone()
        };

        if let Err(e) = crate::db::matches::upsert_match(&self.pool, &record).await {
            error!("Failed to persist terminal state of match {}: {}", match_id, e);
        }

        info!("Match {} resolved as {}", match_id, status);

        self.completions.emit_lossy(CompletionEvent {
            match_id,
            status,
            papers: record.papers.clone(),
            scope: record.scope.clone(),
            timestamp: record.completed_at.unwrap_or_else(Utc::now),
        });
    }
}

/// Check a match spec and return the resolved paper list
///
/// Exactly two distinct agents, one judge distinct from both, and either
/// one paper (single mode) or two distinct papers (comparison mode).
fn validate_spec(spec: &MatchSpec) -> Result<Vec<PaperId>> {
    if spec.agent1_id == spec.agent2_id {
        return Err(Error::Validation(
            "A match requires two distinct reviewer agents".to_string(),
        ));
    }
    if spec.judge_id == spec.agent1_id || spec.judge_id == spec.agent2_id {
        return Err(Error::Validation(
            "The judge must be distinct from both reviewer agents".to_string(),
        ));
    }

    match (&spec.paper_id, &spec.paper1_id, &spec.paper2_id) {
        (Some(paper), None, None) => Ok(vec![paper.clone()]),
        (None, Some(paper1), Some(paper2)) => {
            if paper1 == paper2 {
                return Err(Error::Validation(
                    "Comparison matches require two distinct papers".to_string(),
                ));
            }
            Ok(vec![paper1.clone(), paper2.clone()])
        }
        _ => Err(Error::Validation(
            "Provide either paper_id or both paper1_id and paper2_id".to_string(),
        )),
    }
}

/// Build the outcome from a runner report
///
/// In comparison mode the winner is the paper with the higher judge score,
/// a draw on equality. Single-paper matches never declare a winner; they
/// refresh the paper's score only.
fn resolve_outcome(papers: &[PaperId], report: RunReport) -> MatchOutcome {
    let winner = if papers.len() == 2 {
        let score1 = report.paper_scores.get(&papers[0]).copied().unwrap_or(0.0);
        let score2 = report.paper_scores.get(&papers[1]).copied().unwrap_or(0.0);
        if score1 > score2 {
            Some(papers[0].clone())
        } else if score2 > score1 {
            Some(papers[1].clone())
        } else {
            None
        }
    } else {
        None
    };

    MatchOutcome {
        winner,
        paper_scores: report.paper_scores,
        reviews: report.reviews,
        summary: report.summary,
        placeholder: false,
    }
}

/// Synthetic outcome recorded when the agent runner is unreachable
fn placeholder_outcome(record: &Match) -> MatchOutcome {
    let mut paper_scores = BTreeMap::new();
    let mut reviews = Vec::new();
    for (i, paper) in record.papers.iter().enumerate() {
        paper_scores.insert(paper.clone(), 0.0);
        let agent_id = if record.papers.len() == 2 && i == 1 {
            record.agent2_id
        } else {
            record.agent1_id
        };
        reviews.push(Review {
            agent_id,
            paper_id: paper.clone(),
            content: PLACEHOLDER_REVIEW.to_string(),
            technical_score: 0.0,
            depth_score: 0.0,
            clarity_score: 0.0,
            overall_score: 0.0,
        });
    }

    MatchOutcome {
        winner: None,
        paper_scores,
        reviews,
        summary: PLACEHOLDER_REVIEW.to_string(),
        placeholder: true,
    }
}
