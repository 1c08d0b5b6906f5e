//! End-to-end engine tests: orchestrator -> completion bus -> ranking
//! pipeline -> channel broadcast
//!
//! These drive the wired engine the way the HTTP layer does, with a
//! scripted agent runner standing in for the external reviewer service.

mod common;

use arena_common::events::ChannelMessage;
use arena_common::model::{CatalogScope, MatchStatus, ReactionKind};
use arena_common::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::timeout;
use uuid::Uuid;

use common::{comparison_spec, engine, scores, GatedRunner};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_completion_drives_rankings_and_performance_broadcast() {
    let runner = Arc::new(GatedRunner::gated(scores(&[
        ("paper-a", 4.5),
        ("paper-b", 3.0),
    ])));
    let state = engine(runner.clone()).await;

    let mut completions = state.completions.subscribe();
    let record = state
        .orchestrator
        .clone()
        .create(comparison_spec("paper-a", "paper-b"))
        .await
        .unwrap();
    state.feedback.register(record.id).await;
    assert_eq!(record.status, MatchStatus::InProgress);

    // Subscribe before the runner is released so the broadcast cannot be
    // missed; at-most-once delivery has no replay
    let mut subscription = state.channel.connect(&record, Uuid::new_v4()).await.unwrap();
    match subscription.recv().await.unwrap() {
        ChannelMessage::Initial { .. } => {}
        other => panic!("Expected initial, got {}", other.event_type()),
    }

    runner.release(1);

    let event = timeout(WAIT, completions.recv()).await.unwrap().unwrap();
    assert_eq!(event.status, MatchStatus::Completed);
    assert_eq!(event.match_id, record.id);

    let message = timeout(WAIT, subscription.recv()).await.unwrap().unwrap();
    match message {
        ChannelMessage::Performance { entries } => {
            assert_eq!(entries.len(), 2);
            let a = entries.iter().find(|e| e.paper_id == "paper-a").unwrap();
            let b = entries.iter().find(|e| e.paper_id == "paper-b").unwrap();
            assert_eq!(a.rank, 1);
            assert_eq!(a.wins, 1);
            assert_eq!(a.win_rate, 1.0);
            assert_eq!(b.rank, 2);
            assert_eq!(b.wins, 0);
        }
        other => panic!("Expected performance, got {}", other.event_type()),
    }

    let resolved = state.orchestrator.get(record.id).await.unwrap();
    assert_eq!(resolved.status, MatchStatus::Completed);
    let outcome = resolved.outcome.unwrap();
    assert_eq!(outcome.winner.as_deref(), Some("paper-a"));
    assert!(!outcome.placeholder);
}

#[tokio::test]
async fn test_runner_outage_resolves_with_placeholder_and_still_broadcasts() {
    let runner = Arc::new(GatedRunner::gated(common::RunnerScript::Outage));
    let state = engine(runner.clone()).await;

    let mut completions = state.completions.subscribe();
    let record = state
        .orchestrator
        .clone()
        .create(comparison_spec("paper-a", "paper-b"))
        .await
        .unwrap();
    state.feedback.register(record.id).await;

    let mut subscription = state.channel.connect(&record, Uuid::new_v4()).await.unwrap();
    subscription.recv().await.unwrap(); // initial

    runner.release(1);

    // The outage is absorbed: the match resolves as failed instead of
    // hanging in_progress
    let event = timeout(WAIT, completions.recv()).await.unwrap().unwrap();
    assert_eq!(event.status, MatchStatus::Failed);

    let resolved = state.orchestrator.get(record.id).await.unwrap();
    assert_eq!(resolved.status, MatchStatus::Failed);
    let outcome = resolved.outcome.expect("placeholder outcome must be attached");
    assert!(outcome.placeholder);
    assert!(outcome.winner.is_none());
    assert!(outcome.paper_scores.values().all(|&s| s == 0.0));

    // The performance broadcast still fires; failed matches just carry no
    // ranking weight
    let message = timeout(WAIT, subscription.recv()).await.unwrap().unwrap();
    match message {
        ChannelMessage::Performance { entries } => assert!(entries.is_empty()),
        other => panic!("Expected performance, got {}", other.event_type()),
    }
}

#[tokio::test]
async fn test_invalid_spec_produces_no_record_and_no_event() {
    let runner = Arc::new(GatedRunner::released(scores(&[])));
    let state = engine(runner).await;

    let mut completions = state.completions.subscribe();

    let mut spec = comparison_spec("paper-a", "paper-b");
    spec.agent2_id = spec.agent1_id;
    let err = state.orchestrator.clone().create(spec).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert!(state.orchestrator.list(None).await.is_empty());
    assert!(matches!(
        completions.try_recv(),
        Err(TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn test_fresh_connect_sees_authoritative_counts() {
    // The runner never resolves, so the match stays in_progress while
    // feedback accumulates
    let runner = Arc::new(GatedRunner::gated(scores(&[])));
    let state = engine(runner).await;

    let record = state
        .orchestrator
        .clone()
        .create(comparison_spec("paper-a", "paper-b"))
        .await
        .unwrap();
    state.feedback.register(record.id).await;

    for i in 0..3 {
        state
            .feedback
            .react(record.id, &format!("fan-{}", i), ReactionKind::Like)
            .await
            .unwrap();
    }
    for i in 0..2 {
        state
            .feedback
            .react(record.id, &format!("critic-{}", i), ReactionKind::Dislike)
            .await
            .unwrap();
    }
    state
        .feedback
        .comment(record.id, Some("fan-0"), "close one", vec![], false)
        .await
        .unwrap();

    let mut subscription = state.channel.connect(&record, Uuid::new_v4()).await.unwrap();
    match subscription.recv().await.unwrap() {
        ChannelMessage::Initial { feedback, .. } => {
            assert_eq!(feedback.likes, 3);
            assert_eq!(feedback.dislikes, 2);
            assert_eq!(feedback.comments.len(), 1);
        }
        other => panic!("Expected initial, got {}", other.event_type()),
    }
}

#[tokio::test]
async fn test_rankings_accumulate_across_matches() {
    let runner = Arc::new(GatedRunner::released(scores(&[
        ("paper-a", 4.5),
        ("paper-b", 4.5),
        ("paper-c", 2.0),
    ])));
    let state = engine(runner).await;

    let mut completions = state.completions.subscribe();

    // a beats c twice; b beats c once; a and b end fully tied on score
    // and win rate
    for spec in [
        comparison_spec("paper-a", "paper-c"),
        comparison_spec("paper-a", "paper-c"),
        comparison_spec("paper-b", "paper-c"),
    ] {
        let record = state.orchestrator.clone().create(spec).await.unwrap();
        state.feedback.register(record.id).await;
    }
    for _ in 0..3 {
        let event = timeout(WAIT, completions.recv()).await.unwrap().unwrap();
        assert_eq!(event.status, MatchStatus::Completed);
    }

    // Recompute already ran for the last event by the time its broadcast
    // went out; fetch through the aggregator
    let scope = CatalogScope {
        category: "cs".to_string(),
        subcategory: "ai".to_string(),
        year: 2024,
    };

    // Wait for the pipeline to process the final completion
    let entries = timeout(WAIT, async {
        loop {
            let entries = state.ranking.rankings(&scope).await;
            if entries.len() == 3 {
                break entries;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let a = entries.iter().find(|e| e.paper_id == "paper-a").unwrap();
    let b = entries.iter().find(|e| e.paper_id == "paper-b").unwrap();
    let c = entries.iter().find(|e| e.paper_id == "paper-c").unwrap();

    // Score tie between a and b broken by win rate
    assert_eq!(a.score, 4.5);
    assert_eq!(b.score, 4.5);
    assert_eq!(a.win_rate, 1.0);
    assert_eq!(b.win_rate, 1.0);
    assert_eq!(c.wins, 0);
    assert_eq!(c.matches, 3);
    assert_eq!(c.rank, 3);
    // a and b fully tied on score and win rate: paper id breaks the tie
    assert_eq!(a.rank, 1);
    assert_eq!(b.rank, 2);
}
