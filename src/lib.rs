//! # Valo Tracker
//!
//! Competitive match analytics and a persistent multi-tenant daily
//! leaderboard, fed by an upstream match-history provider.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (matches, identities, snapshots)
//! - **fetch**: Upstream match-history client
//! - **analytics**: Profile aggregation and round timeline reconstruction
//! - **leaderboard**: Daily score engine, distribution, and scheduling
//! - **storage**: JSON state persistence with legacy-format migration
//! - **config**: Configuration loading and validation

pub mod analytics;
pub mod config;
pub mod fetch;
pub mod leaderboard;
pub mod models;
pub mod storage;

pub use models::*;
