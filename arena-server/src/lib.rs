//! # Arena Engine Service (arena-server)
//!
//! Real-time feedback aggregation and ranking engine for the review arena.
//!
//! **Purpose:** Keep an authoritative, race-free count of likes, dislikes
//! and comments per match, push deltas to every viewer over a persistent
//! channel, and recompute paper rankings whenever a match resolves -
//! including the placeholder-outcome fallback when the external review
//! agent is unreachable.
//!
//! **Architecture:** Event-driven tokio service. Feedback mutations go
//! through one owning writer per match; match completions flow over a
//! broadcast bus into the ranking pipeline, which fans updated performance
//! entries back out over the channel.

pub mod api;
pub mod channel;
pub mod db;
pub mod events;
pub mod feedback;
pub mod orchestrator;
pub mod pipeline;
pub mod ranking;
pub mod state;

pub use arena_common::{Error, Result};
pub use state::AppState;
