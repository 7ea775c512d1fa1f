//! Core data models for the tracker.

mod identity;
mod leaderboard;
mod match_record;

pub use identity::*;
pub use leaderboard::*;
pub use match_record::*;
