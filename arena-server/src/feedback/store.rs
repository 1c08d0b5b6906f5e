//! Feedback store implementation
//!
//! One owning writer per match: every mutation for a given match funnels
//! through that match's lock, so same-match writes serialize while
//! independent matches stay fully parallel. Accepted mutations write
//! through to the database before the in-memory state is updated, and the
//! in-memory state is what snapshots and broadcasts read.

use arena_common::model::{Comment, FeedbackSnapshot, ReactionCounts, ReactionKind};
use arena_common::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::db;

/// Result of a reaction mutation: the new authoritative counts plus the
/// calling user's reaction after the toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionState {
    pub counts: ReactionCounts,
    pub user_reaction: Option<ReactionKind>,
}

/// Per-match feedback state, guarded by the match's own lock
#[derive(Default)]
struct MatchFeedback {
    reactions: HashMap<String, ReactionKind>,
    counts: ReactionCounts,
    comments: Vec<Comment>,
    /// Next comment sequence number; strictly increasing, never reused
    next_seq: u64,
}

impl MatchFeedback {
    fn new() -> Self {
        Self {
            next_seq: 1,
            ..Default::default()
        }
    }

    fn bucket_mut(&mut self, kind: ReactionKind) -> &mut u64 {
        match kind {
            ReactionKind::Like => &mut self.counts.likes,
            ReactionKind::Dislike => &mut self.counts.dislikes,
        }
    }
}

/// Authoritative per-match feedback state: reaction counts + comment log
pub struct FeedbackStore {
    pool: SqlitePool,
    matches: RwLock<HashMap<Uuid, Arc<Mutex<MatchFeedback>>>>,
}

impl FeedbackStore {
    /// Create an empty store backed by the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            matches: RwLock::new(HashMap::new()),
        }
    }

    /// Register a match so feedback can be attached to it
    ///
    /// Idempotent; called when a match is created and during hydration.
    pub async fn register(&self, match_id: Uuid) {
        let mut matches = self.matches.write().await;
        matches
            .entry(match_id)
            .or_insert_with(|| Arc::new(Mutex::new(MatchFeedback::new())));
    }

    /// Rebuild in-memory state for the given matches from persisted rows
    pub async fn hydrate(&self, match_ids: &[Uuid]) -> Result<()> {
        for &match_id in match_ids {
            let comments = db::feedback::load_comments(&self.pool, match_id).await?;
            let reactions = db::feedback::load_reactions(&self.pool, match_id).await?;

            let mut state = MatchFeedback::new();
            state.next_seq = comments.iter().map(|c| c.seq + 1).max().unwrap_or(1);
            state.comments = comments;
            for (user_id, kind) in reactions {
                *state.bucket_mut(kind) += 1;
                state.reactions.insert(user_id, kind);
            }

            let mut matches = self.matches.write().await;
            matches.insert(match_id, Arc::new(Mutex::new(state)));
        }
        debug!("Hydrated feedback state for {} matches", match_ids.len());
        Ok(())
    }

    async fn entry(&self, match_id: Uuid) -> Result<Arc<Mutex<MatchFeedback>>> {
        let matches = self.matches.read().await;
        matches
            .get(&match_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Match {} not found", match_id)))
    }

    /// Apply a like/dislike with toggle semantics
    ///
    /// Same kind clears the reaction, a different kind moves the user
    /// between buckets atomically, no prior reaction adds one. Atomic per
    /// (match, user): concurrent calls from the same user serialize behind
    /// the match lock, and counts never race because this is the only
    /// mutation path.
    pub async fn react(
        &self,
        match_id: Uuid,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactionState> {
        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;

        let previous = state.reactions.get(user_id).copied();
        let user_reaction = match previous {
            Some(prev) if prev == kind => {
                db::feedback::delete_reaction(&self.pool, match_id, user_id).await?;
                state.reactions.remove(user_id);
                *state.bucket_mut(prev) -= 1;
                None
            }
            Some(prev) => {
                db::feedback::upsert_reaction(&self.pool, match_id, user_id, kind).await?;
                state.reactions.insert(user_id.to_string(), kind);
                *state.bucket_mut(prev) -= 1;
                *state.bucket_mut(kind) += 1;
                Some(kind)
            }
            None => {
                db::feedback::upsert_reaction(&self.pool, match_id, user_id, kind).await?;
                state.reactions.insert(user_id.to_string(), kind);
                *state.bucket_mut(kind) += 1;
                Some(kind)
            }
        };

        debug!(
            "Reaction {} by {} on match {}: {} likes / {} dislikes",
            kind, user_id, match_id, state.counts.likes, state.counts.dislikes
        );

        Ok(ReactionState {
            counts: state.counts,
            user_reaction,
        })
    }

    /// Append a comment to a match
    ///
    /// Comments may be posted anonymously only via the explicit flag; a
    /// caller without verified identity that did not request anonymity is
    /// rejected. The sequence number is assigned at the moment of
    /// acceptance.
    pub async fn comment(
        &self,
        match_id: Uuid,
        identity: Option<&str>,
        text: &str,
        tags: Vec<String>,
        anonymous: bool,
    ) -> Result<Comment> {
        if text.trim().is_empty() {
            return Err(Error::Validation(
                "Comment text must not be empty".to_string(),
            ));
        }

        let author = if anonymous {
            None
        } else {
            match identity {
                Some(id) => Some(id.to_string()),
                None => {
                    return Err(Error::Unauthorized(
                        "Comment requires a verified identity or the anonymous flag".to_string(),
                    ))
                }
            }
        };

        let entry = self.entry(match_id).await?;
        let mut state = entry.lock().await;

        let comment = Comment {
            seq: state.next_seq,
            match_id,
            author,
            text: text.to_string(),
            tags,
            created_at: Utc::now(),
        };

        db::feedback::insert_comment(&self.pool, &comment).await?;
        state.next_seq += 1;
        state.comments.push(comment.clone());

        debug!(
            "Comment #{} accepted on match {} ({} total)",
            comment.seq,
            match_id,
            state.comments.len()
        );

        Ok(comment)
    }

    /// Read the full current feedback state for a match
    ///
    /// Always reflects the latest accepted mutation.
    pub async fn snapshot(&self, match_id: Uuid) -> Result<FeedbackSnapshot> {
        let entry = self.entry(match_id).await?;
        let state = entry.lock().await;
        Ok(FeedbackSnapshot {
            likes: state.counts.likes,
            dislikes: state.counts.dislikes,
            comments: state.comments.clone(),
        })
    }
}
