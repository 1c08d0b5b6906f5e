//! Optimistic local state reconciled against authoritative pushes
//!
//! The view is replaced immutably on every message: derived state is
//! rebuilt, never patched into shared nested structures. Optimistic
//! reaction math mirrors the server's toggle semantics and is overridden
//! by the next authoritative `feedback_update` or `initial`.

use arena_common::events::ChannelMessage;
use arena_common::model::{Comment, RankingEntry, ReactionKind};

/// A viewer's current picture of one match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchView {
    pub likes: u64,
    pub dislikes: u64,
    pub comments: Vec<Comment>,
    pub performance: Vec<RankingEntry>,
    /// The viewer's own reaction, tracked locally for toggle math
    pub my_reaction: Option<ReactionKind>,
    /// Whether an authoritative snapshot has arrived yet
    pub synced: bool,
}

impl MatchView {
    /// Build the next view from a channel message
    ///
    /// Returns a fresh value; `self` is never mutated.
    pub fn apply(&self, message: &ChannelMessage) -> MatchView {
        match message {
            ChannelMessage::Initial {
                feedback,
                performance,
            } => MatchView {
                likes: feedback.likes,
                dislikes: feedback.dislikes,
                comments: feedback.comments.clone(),
                performance: performance.clone(),
                my_reaction: self.my_reaction,
                synced: true,
            },
            ChannelMessage::Feedback { comment } => {
                // Deliveries can overlap with a fresh snapshot after a
                // reconnect; the per-match sequence number dedupes
                if self.comments.iter().any(|c| c.seq == comment.seq) {
                    return self.clone();
                }
                let mut comments = self.comments.clone();
                comments.push(comment.clone());
                comments.sort_by_key(|c| c.seq);
                MatchView {
                    comments,
                    ..self.clone()
                }
            }
            ChannelMessage::FeedbackUpdate { likes, dislikes } => MatchView {
                likes: *likes,
                dislikes: *dislikes,
                ..self.clone()
            },
            ChannelMessage::Performance { entries } => MatchView {
                performance: entries.clone(),
                ..self.clone()
            },
        }
    }

    /// Apply the viewer's own reaction optimistically
    ///
    /// Same toggle semantics as the server; the next authoritative counts
    /// replace these.
    pub fn apply_local_reaction(&self, kind: ReactionKind) -> MatchView {
        let mut next = self.clone();
        match self.my_reaction {
            Some(prev) if prev == kind => {
                *next.bucket_mut(prev) -= 1;
                next.my_reaction = None;
            }
            Some(prev) => {
                *next.bucket_mut(prev) -= 1;
                *next.bucket_mut(kind) += 1;
                next.my_reaction = Some(kind);
            }
            None => {
                *next.bucket_mut(kind) += 1;
                next.my_reaction = Some(kind);
            }
        }
        next
    }

    fn bucket_mut(&mut self, kind: ReactionKind) -> &mut u64 {
        match kind {
            ReactionKind::Like => &mut self.likes,
            ReactionKind::Dislike => &mut self.dislikes,
        }
    }
}

/// Holds the current view and folds messages into it
#[derive(Debug, Default)]
pub struct ReconciliationClient {
    view: MatchView,
}

impl ReconciliationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &MatchView {
        &self.view
    }

    /// Fold one channel message into the view
    pub fn handle(&mut self, message: &ChannelMessage) {
        self.view = self.view.apply(message);
    }

    /// Record the viewer's own reaction before the server confirms it
    pub fn react(&mut self, kind: ReactionKind) {
        self.view = self.view.apply_local_reaction(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_common::model::FeedbackSnapshot;
    use chrono::Utc;
    use uuid::Uuid;

    fn comment(seq: u64) -> Comment {
        Comment {
            seq,
            match_id: Uuid::new_v4(),
            author: Some("alice".to_string()),
            text: format!("comment {}", seq),
            tags: vec![],
            created_at: Utc::now(),
        }
    }

    fn initial(likes: u64, dislikes: u64, comments: Vec<Comment>) -> ChannelMessage {
        ChannelMessage::Initial {
            feedback: FeedbackSnapshot {
                likes,
                dislikes,
                comments,
            },
            performance: vec![],
        }
    }

    #[test]
    fn test_initial_replaces_state_immutably() {
        let view = MatchView::default();
        let next = view.apply(&initial(4, 1, vec![comment(1)]));

        assert_eq!(next.likes, 4);
        assert_eq!(next.dislikes, 1);
        assert_eq!(next.comments.len(), 1);
        assert!(next.synced);

        // The prior view is untouched
        assert_eq!(view, MatchView::default());
        assert!(!view.synced);
    }

    #[test]
    fn test_feedback_appends_in_sequence_order() {
        let mut client = ReconciliationClient::new();
        client.handle(&initial(0, 0, vec![comment(2)]));
        client.handle(&ChannelMessage::Feedback {
            comment: comment(3),
        });
        client.handle(&ChannelMessage::Feedback {
            comment: comment(1),
        });

        let seqs: Vec<u64> = client.view().comments.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_comment_ignored() {
        let mut client = ReconciliationClient::new();
        client.handle(&initial(0, 0, vec![comment(1)]));
        client.handle(&ChannelMessage::Feedback {
            comment: comment(1),
        });
        assert_eq!(client.view().comments.len(), 1);
    }

    #[test]
    fn test_optimistic_toggle_matches_server_semantics() {
        let view = MatchView {
            likes: 2,
            dislikes: 1,
            synced: true,
            ..Default::default()
        };

        let liked = view.apply_local_reaction(ReactionKind::Like);
        assert_eq!(liked.likes, 3);
        assert_eq!(liked.my_reaction, Some(ReactionKind::Like));

        let moved = liked.apply_local_reaction(ReactionKind::Dislike);
        assert_eq!(moved.likes, 2);
        assert_eq!(moved.dislikes, 2);

        let cleared = moved.apply_local_reaction(ReactionKind::Dislike);
        assert_eq!(cleared.dislikes, 1);
        assert_eq!(cleared.my_reaction, None);
    }

    #[test]
    fn test_authoritative_counts_override_optimistic_state() {
        let mut client = ReconciliationClient::new();
        client.handle(&initial(5, 0, vec![]));
        client.react(ReactionKind::Like);
        assert_eq!(client.view().likes, 6);

        // Server settles on different counts (another user un-reacted
        // concurrently); the push wins
        client.handle(&ChannelMessage::FeedbackUpdate {
            likes: 5,
            dislikes: 0,
        });
        assert_eq!(client.view().likes, 5);
        // The local toggle memory survives for the next optimistic step
        assert_eq!(client.view().my_reaction, Some(ReactionKind::Like));
    }

    #[test]
    fn test_performance_replaces_entries() {
        let mut client = ReconciliationClient::new();
        let entry = RankingEntry {
            paper_id: "paper-a".to_string(),
            matches: 2,
            wins: 2,
            win_rate: 1.0,
            score: 4.5,
            rank: 1,
        };
        client.handle(&ChannelMessage::Performance {
            entries: vec![entry.clone()],
        });
        assert_eq!(client.view().performance, vec![entry]);
    }
}
