//! Paper ranking recomputation
//!
//! Rankings are a property of the whole outcome set, not of a single
//! entity, so every completion event triggers a full recompute instead of
//! an incremental patch. Recomputing twice on the same outcome set yields
//! identical output, independent of the order matches resolved in.

use arena_common::model::{CatalogScope, Match, MatchStatus, PaperId, RankingEntry};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Per-paper accumulator used during a recompute
#[derive(Default)]
struct PaperStats {
    matches: u64,
    wins: u64,
    score: f64,
}

/// Deterministic ranking over papers from completed match outcomes
///
/// Each catalog scope (category/subcategory/year) is an independent
/// leaderboard; a paper belongs to exactly one scope.
pub struct RankingAggregator {
    rankings: RwLock<BTreeMap<CatalogScope, Vec<RankingEntry>>>,
}

impl RankingAggregator {
    pub fn new() -> Self {
        Self {
            rankings: RwLock::new(BTreeMap::new()),
        }
    }

    /// Recompute all scopes from the current set of completed matches
    pub async fn recompute(&self, completed: &[Match]) {
        let mut by_scope: BTreeMap<CatalogScope, Vec<&Match>> = BTreeMap::new();
        for record in completed {
            if record.status != MatchStatus::Completed {
                continue;
            }
            by_scope
                .entry(record.scope.clone())
                .or_default()
                .push(record);
        }

        let mut next = BTreeMap::new();
        for (scope, matches) in by_scope {
            next.insert(scope, compute_scope_rankings(matches));
        }

        let mut rankings = self.rankings.write().await;
        *rankings = next;
        debug!("Recomputed rankings for {} scopes", rankings.len());
    }

    /// Ordered ranking entries for one catalog scope
    pub async fn rankings(&self, scope: &CatalogScope) -> Vec<RankingEntry> {
        let rankings = self.rankings.read().await;
        rankings.get(scope).cloned().unwrap_or_default()
    }

    /// Current entries for the given papers, across scopes
    pub async fn entries_for_papers(&self, papers: &[PaperId]) -> Vec<RankingEntry> {
        let rankings = self.rankings.read().await;
        let mut result = Vec::new();
        for entries in rankings.values() {
            for entry in entries {
                if papers.contains(&entry.paper_id) {
                    result.push(entry.clone());
                }
            }
        }
        result
    }
}

impl Default for RankingAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// wins / matches, 0 when a paper has no matches
fn win_rate(wins: u64, matches: u64) -> f64 {
    if matches == 0 {
        0.0
    } else {
        wins as f64 / matches as f64
    }
}

/// Rank one scope's papers from its completed matches
///
/// Score is the most recent judge evaluation score (last value wins, not an
/// average). Sort: score descending, ties by win rate descending, remaining
/// ties by paper id ascending for full determinism.
fn compute_scope_rankings(mut matches: Vec<&Match>) -> Vec<RankingEntry> {
    // Completion order decides which score is "most recent"; the id
    // tiebreak keeps simultaneous completions deterministic
    matches.sort_by(|a, b| {
        a.completed_at
            .cmp(&b.completed_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut stats: BTreeMap<PaperId, PaperStats> = BTreeMap::new();
    for record in matches {
        let Some(outcome) = record.outcome.as_ref() else {
            continue;
        };
        for paper in &record.papers {
            let entry = stats.entry(paper.clone()).or_default();
            entry.matches += 1;
            if outcome.winner.as_ref() == Some(paper) {
                entry.wins += 1;
            }
            if let Some(&score) = outcome.paper_scores.get(paper) {
                entry.score = score;
            }
        }
    }

    let mut entries: Vec<RankingEntry> = stats
        .into_iter()
        .map(|(paper_id, stats)| RankingEntry {
            paper_id,
            matches: stats.matches,
            wins: stats.wins,
            win_rate: win_rate(stats.wins, stats.matches),
            score: stats.score,
            rank: 0,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.win_rate.total_cmp(&a.win_rate))
            .then_with(|| a.paper_id.cmp(&b.paper_id))
    });

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = (i + 1) as u64;
    }

    entries
}
