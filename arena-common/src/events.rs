//! Channel message types for the real-time feedback channel
//!
//! Every message pushed to a viewer is one of the variants below, tagged by
//! `type` for wire dispatch. Clients handle the closed set through a single
//! match, not per-message callbacks.

use serde::{Deserialize, Serialize};

use crate::model::{Comment, FeedbackSnapshot, RankingEntry};

/// Server-to-client channel messages
///
/// Delivery is at-most-once, best-effort; there is no replay of missed
/// deltas across a disconnect. A reconnecting client relies entirely on the
/// fresh `initial` snapshot for consistency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Sent once on connect: full feedback snapshot plus current
    /// performance context for the match's papers
    Initial {
        feedback: FeedbackSnapshot,
        performance: Vec<RankingEntry>,
    },

    /// A new comment was accepted
    Feedback { comment: Comment },

    /// Reaction counts changed
    FeedbackUpdate { likes: u64, dislikes: u64 },

    /// Rankings were recomputed for the match's papers
    Performance { entries: Vec<RankingEntry> },
}

impl ChannelMessage {
    /// Get message type as string for wire event naming
    pub fn event_type(&self) -> &'static str {
        match self {
            ChannelMessage::Initial { .. } => "initial",
            ChannelMessage::Feedback { .. } => "feedback",
            ChannelMessage::FeedbackUpdate { .. } => "feedback_update",
            ChannelMessage::Performance { .. } => "performance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_message_type_tags() {
        let msg = ChannelMessage::FeedbackUpdate {
            likes: 3,
            dislikes: 1,
        };
        assert_eq!(msg.event_type(), "feedback_update");

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"feedback_update\""));
        assert!(json.contains("\"likes\":3"));
    }

    #[test]
    fn test_initial_round_trip() {
        let msg = ChannelMessage::Initial {
            feedback: FeedbackSnapshot {
                likes: 2,
                dislikes: 0,
                comments: vec![Comment {
                    seq: 1,
                    match_id: Uuid::new_v4(),
                    author: Some("reviewer42".to_string()),
                    text: "Sharp rebuttal in section 3".to_string(),
                    tags: vec!["insightful".to_string()],
                    created_at: Utc::now(),
                }],
            },
            performance: vec![],
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"initial\""));

        let parsed: ChannelMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ChannelMessage::Initial { feedback, .. } => {
                assert_eq!(feedback.likes, 2);
                assert_eq!(feedback.comments.len(), 1);
                assert_eq!(feedback.comments[0].seq, 1);
            }
            _ => panic!("Wrong message type deserialized"),
        }
    }

    #[test]
    fn test_feedback_carries_comment() {
        let comment = Comment {
            seq: 7,
            match_id: Uuid::new_v4(),
            author: None,
            text: "anonymous hot take".to_string(),
            tags: vec![],
            created_at: Utc::now(),
        };
        let msg = ChannelMessage::Feedback {
            comment: comment.clone(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ChannelMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ChannelMessage::Feedback { comment: c } => {
                assert_eq!(c.seq, 7);
                assert!(c.author.is_none());
            }
            _ => panic!("Wrong message type deserialized"),
        }
    }
}
