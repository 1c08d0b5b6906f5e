//! Domain model shared by the arena services
//!
//! Match records are created on request and mutated only by the match
//! orchestrator; once a match reaches a terminal status the record is
//! immutable apart from attached feedback. Reaction and comment state is
//! owned exclusively by the feedback store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Paper identifiers are owned by the paper catalog and treated as opaque
/// strings here (e.g. "paper-cs-ai-2024-001").
pub type PaperId = String;

/// Match lifecycle states
///
/// Transitions: pending -> in_progress -> completed | failed.
/// No transition skips in_progress; terminal states are final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl MatchStatus {
    /// Whether the match has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Failed)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "failed" => Ok(MatchStatus::Failed),
            other => Err(crate::Error::Validation(format!(
                "Unknown match status: {}",
                other
            ))),
        }
    }
}

/// Catalog scope a match (and its papers) belongs to
///
/// Rankings are computed per scope; a paper belongs to exactly one scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogScope {
    pub category: String,
    pub subcategory: String,
    pub year: i32,
}

/// Request to create a match
///
/// Either `paper_id` (single mode: both agents review the same paper) or
/// `paper1_id` + `paper2_id` (comparison mode: the papers compete head to
/// head) must be provided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpec {
    pub agent1_id: Uuid,
    pub agent2_id: Uuid,
    pub judge_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<PaperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper1_id: Option<PaperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper2_id: Option<PaperId>,
    pub category: String,
    pub subcategory: String,
    pub year: i32,
}

/// One agent's review of one paper, scored by the judge (0-5 scale)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub agent_id: Uuid,
    pub paper_id: PaperId,
    pub content: String,
    pub technical_score: f64,
    pub depth_score: f64,
    pub clarity_score: f64,
    pub overall_score: f64,
}

/// Terminal result of a match
///
/// `placeholder` marks a synthetic outcome substituted when the external
/// agent runner was unreachable: zeroed scores, explanatory review text,
/// no winner. Such outcomes still flow through the completion pipeline so
/// rankings and broadcasts never stall on a reviewer outage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Winning paper, None for a draw (and always None in single mode)
    pub winner: Option<PaperId>,
    /// Judge overall score per paper; BTreeMap for deterministic iteration
    pub paper_scores: BTreeMap<PaperId, f64>,
    pub reviews: Vec<Review>,
    /// Judge rationale
    pub summary: String,
    #[serde(default)]
    pub placeholder: bool,
}

/// A match between two reviewer agents, adjudicated by a judge agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub status: MatchStatus,
    pub agent1_id: Uuid,
    pub agent2_id: Uuid,
    pub judge_id: Uuid,
    /// One paper (single mode) or two papers (comparison mode)
    pub papers: Vec<PaperId>,
    pub scope: CatalogScope,
    pub outcome: Option<MatchOutcome>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A viewer's reaction to a match, mutually exclusive and toggleable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionKind::Like => write!(f, "like"),
            ReactionKind::Dislike => write!(f, "dislike"),
        }
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(crate::Error::Validation(format!(
                "Unknown reaction kind: {}",
                other
            ))),
        }
    }
}

/// Aggregate reaction counts for a match
///
/// Invariant: `likes + dislikes` equals the number of users whose current
/// reaction is not none; a user occupies at most one bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionCounts {
    pub likes: u64,
    pub dislikes: u64,
}

/// A community comment on a match
///
/// `seq` is strictly increasing per match, assigned at the moment of
/// acceptance, never reused. Comments are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub seq: u64,
    pub match_id: Uuid,
    /// Verified identity of the author; None when posted anonymously
    pub author: Option<String>,
    pub text: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Full current feedback state for a match, sent on channel connect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    pub likes: u64,
    pub dislikes: u64,
    pub comments: Vec<Comment>,
}

/// One row of the paper leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    pub paper_id: PaperId,
    /// Completed matches referencing this paper
    pub matches: u64,
    /// Completed matches where this paper is the declared winner
    pub wins: u64,
    /// wins / matches, 0 when matches == 0
    pub win_rate: f64,
    /// Most recent judge evaluation score (last value wins, not an average)
    pub score: f64,
    /// 1-based position after sorting
    pub rank: u64,
}
