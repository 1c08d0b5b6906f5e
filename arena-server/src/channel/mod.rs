//! Real-time fan-out channel
//!
//! Delivers feedback and ranking changes to every subscriber of a match and
//! gives newly connecting subscribers a consistent starting point.

mod broadcaster;

pub use broadcaster::{RealtimeChannel, Subscription};
