//! Canonical per-match feedback state
//!
//! The feedback store is the single owner of reaction counts and the
//! comment log. Nothing else mutates them; the channel and viewers only
//! observe snapshots and deltas.

mod store;

pub use store::{FeedbackStore, ReactionState};
