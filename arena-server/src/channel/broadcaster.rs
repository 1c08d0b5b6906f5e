//! Per-match subscription registry and broadcaster
//!
//! Fan-out is non-blocking and best-effort: every subscriber owns an
//! unbounded queue, a send never waits on a slow client, and delivery is
//! at-most-once with no replay across a disconnect. A reconnecting client
//! relies entirely on the fresh `initial` snapshot.

use arena_common::events::ChannelMessage;
use arena_common::model::{Match, PaperId};
use arena_common::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::feedback::FeedbackStore;
use crate::ranking::RankingAggregator;

struct MatchSubscribers {
    papers: Vec<PaperId>,
    senders: HashMap<Uuid, mpsc::UnboundedSender<ChannelMessage>>,
}

#[derive(Default)]
struct Registry {
    /// match id -> subscribers watching it
    matches: HashMap<Uuid, MatchSubscribers>,
    /// client id -> match id, for idempotent disconnect
    clients: HashMap<Uuid, Uuid>,
}

/// Fan-out broadcaster over per-match subscriptions
///
/// Owns the subscription registry; feedback state and rankings are only
/// read here, never mutated.
pub struct RealtimeChannel {
    feedback: Arc<FeedbackStore>,
    ranking: Arc<RankingAggregator>,
    registry: Arc<Mutex<Registry>>,
}

impl RealtimeChannel {
    pub fn new(feedback: Arc<FeedbackStore>, ranking: Arc<RankingAggregator>) -> Self {
        Self {
            feedback,
            ranking,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Register a subscriber and queue its `initial` message
    ///
    /// The initial message carries the full current feedback snapshot plus
    /// the performance context for the match's papers, so a client that
    /// connects after N accepted reactions always sees the authoritative
    /// counts.
    pub async fn connect(&self, record: &Match, client_id: Uuid) -> Result<Subscription> {
        // Assemble the snapshot before touching the registry so the lock
        // is never held across an await
        let feedback = self.feedback.snapshot(record.id).await?;
        let performance = self.ranking.entries_for_papers(&record.papers).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ChannelMessage::Initial {
            feedback,
            performance,
        });

        {
            let mut registry = self.registry.lock().unwrap();
            registry.clients.insert(client_id, record.id);
            registry
                .matches
                .entry(record.id)
                .or_insert_with(|| MatchSubscribers {
                    papers: record.papers.clone(),
                    senders: HashMap::new(),
                })
                .senders
                .insert(client_id, tx);
        }

        info!(
            "Client {} subscribed to match {} ({} subscribers)",
            client_id,
            record.id,
            self.subscriber_count(record.id)
        );

        Ok(Subscription {
            client_id,
            match_id: record.id,
            rx,
            registry: Arc::clone(&self.registry),
        })
    }

    /// Remove a subscription; idempotent
    pub fn disconnect(&self, client_id: Uuid) {
        disconnect_client(&self.registry, client_id);
    }

    /// Number of subscribers currently watching a match
    pub fn subscriber_count(&self, match_id: Uuid) -> usize {
        let registry = self.registry.lock().unwrap();
        registry
            .matches
            .get(&match_id)
            .map(|s| s.senders.len())
            .unwrap_or(0)
    }

    /// Broadcast an accepted comment to the match's subscribers
    pub fn publish_comment(&self, match_id: Uuid, comment: arena_common::model::Comment) {
        self.broadcast(match_id, ChannelMessage::Feedback { comment });
    }

    /// Broadcast updated reaction counts to the match's subscribers
    pub fn publish_counts(&self, match_id: Uuid, likes: u64, dislikes: u64) {
        self.broadcast(match_id, ChannelMessage::FeedbackUpdate { likes, dislikes });
    }

    /// Broadcast fresh performance entries after a ranking recompute
    ///
    /// Every subscribed match whose papers intersect the affected set gets
    /// a `performance` message with its own papers' entries.
    pub async fn publish_performance(&self, affected: &[PaperId]) {
        let targets: Vec<(Uuid, Vec<PaperId>)> = {
            let registry = self.registry.lock().unwrap();
            registry
                .matches
                .iter()
                .filter(|(_, subs)| subs.papers.iter().any(|p| affected.contains(p)))
                .map(|(&match_id, subs)| (match_id, subs.papers.clone()))
                .collect()
        };

        for (match_id, papers) in targets {
            let entries = self.ranking.entries_for_papers(&papers).await;
            self.broadcast(match_id, ChannelMessage::Performance { entries });
        }
    }

    fn broadcast(&self, match_id: Uuid, message: ChannelMessage) {
        let mut registry = self.registry.lock().unwrap();
        let Some(subscribers) = registry.matches.get_mut(&match_id) else {
            return;
        };
        // Senders whose receiver is gone are dropped on the spot
        subscribers
            .senders
            .retain(|_, tx| tx.send(message.clone()).is_ok());
        debug!(
            "Broadcast {} to {} subscribers of match {}",
            message.event_type(),
            subscribers.senders.len(),
            match_id
        );
    }
}

/// Remove one client from the registry; idempotent
fn disconnect_client(registry: &Mutex<Registry>, client_id: Uuid) {
    let mut registry = registry.lock().unwrap();
    let Some(match_id) = registry.clients.remove(&client_id) else {
        return;
    };
    if let Some(subscribers) = registry.matches.get_mut(&match_id) {
        subscribers.senders.remove(&client_id);
        if subscribers.senders.is_empty() {
            registry.matches.remove(&match_id);
        }
    }
    debug!("Client {} unsubscribed from match {}", client_id, match_id);
}

/// A live subscription to one match's channel
///
/// Dropping the subscription disconnects it; explicit `disconnect` calls
/// for the same client stay idempotent.
pub struct Subscription {
    pub client_id: Uuid,
    pub match_id: Uuid,
    rx: mpsc::UnboundedReceiver<ChannelMessage>,
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("client_id", &self.client_id)
            .field("match_id", &self.match_id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Receive the next message; None when the channel shut down
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        disconnect_client(&self.registry, self.client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use arena_common::model::{CatalogScope, MatchStatus, ReactionKind};
    use chrono::Utc;

    async fn setup() -> (Arc<RealtimeChannel>, Arc<FeedbackStore>, Match) {
        let pool = init_memory_database().await.unwrap();
        let feedback = Arc::new(FeedbackStore::new(pool));
        let ranking = Arc::new(RankingAggregator::new());
        let channel = Arc::new(RealtimeChannel::new(
            Arc::clone(&feedback),
            Arc::clone(&ranking),
        ));

        let record = Match {
            id: Uuid::new_v4(),
            status: MatchStatus::InProgress,
            agent1_id: Uuid::new_v4(),
            agent2_id: Uuid::new_v4(),
            judge_id: Uuid::new_v4(),
            papers: vec!["paper-a".into(), "paper-b".into()],
            scope: CatalogScope {
                category: "cs".into(),
                subcategory: "ai".into(),
                year: 2024,
            },
            outcome: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        feedback.register(record.id).await;
        (channel, feedback, record)
    }

    #[tokio::test]
    async fn test_connect_delivers_initial_snapshot() {
        let (channel, feedback, record) = setup().await;

        // Reactions accepted before the client connects
        feedback
            .react(record.id, "alice", ReactionKind::Like)
            .await
            .unwrap();
        feedback
            .react(record.id, "bob", ReactionKind::Dislike)
            .await
            .unwrap();

        let mut sub = channel.connect(&record, Uuid::new_v4()).await.unwrap();
        match sub.recv().await.unwrap() {
            ChannelMessage::Initial { feedback, .. } => {
                assert_eq!(feedback.likes, 1);
                assert_eq!(feedback.dislikes, 1);
            }
            other => panic!("Expected initial message, got {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers_of_match() {
        let (channel, _feedback, record) = setup().await;

        let mut sub1 = channel.connect(&record, Uuid::new_v4()).await.unwrap();
        let mut sub2 = channel.connect(&record, Uuid::new_v4()).await.unwrap();
        assert_eq!(channel.subscriber_count(record.id), 2);

        // Drain initial messages
        sub1.recv().await.unwrap();
        sub2.recv().await.unwrap();

        channel.publish_counts(record.id, 5, 2);

        for sub in [&mut sub1, &mut sub2] {
            match sub.recv().await.unwrap() {
                ChannelMessage::FeedbackUpdate { likes, dislikes } => {
                    assert_eq!(likes, 5);
                    assert_eq!(dislikes, 2);
                }
                other => panic!("Expected feedback_update, got {}", other.event_type()),
            }
        }
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_scoped() {
        let (channel, _feedback, record) = setup().await;

        let sub1 = channel.connect(&record, Uuid::new_v4()).await.unwrap();
        let sub2 = channel.connect(&record, Uuid::new_v4()).await.unwrap();
        let client1 = sub1.client_id;

        channel.disconnect(client1);
        channel.disconnect(client1);
        assert_eq!(channel.subscriber_count(record.id), 1);

        // The other subscription is unaffected
        drop(sub2);
        assert_eq!(channel.subscriber_count(record.id), 0);
        drop(sub1);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (channel, _feedback, record) = setup().await;
        {
            let _sub = channel.connect(&record, Uuid::new_v4()).await.unwrap();
            assert_eq!(channel.subscriber_count(record.id), 1);
        }
        assert_eq!(channel.subscriber_count(record.id), 0);
    }

    #[tokio::test]
    async fn test_connect_unknown_match_rejected() {
        let (channel, _feedback, mut record) = setup().await;
        record.id = Uuid::new_v4();
        let err = channel.connect(&record, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, arena_common::Error::NotFound(_)));
    }
}
