//! Leaderboard snapshot models.
//!
//! The snapshot is the complete daily leaderboard state: a day key, the
//! per-identity score entries for that day, and the tenant configurations.
//! It is owned and mutated exclusively by the leaderboard engine and
//! persisted after every mutation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scoring weights applied during recompute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub kill: f64,
    pub assist: f64,
    pub win: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            kill: 1.0,
            assist: 0.5,
            win: 5.0,
        }
    }
}

/// One identity's score for a single day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScoreEntry {
    /// Rounded point total for the day.
    pub points: i64,
    pub wins: u32,
    pub kills: u32,

    /// External account id, kept here so distribution can run membership
    /// checks without a registry lookup.
    pub linked_external_id: String,
}

/// One tenant's distribution configuration.
///
/// The membership check is a runtime collaborator and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Opaque destination handle (e.g. a channel id) for the rendering layer.
    pub destination: String,
}

/// The complete leaderboard state for one day key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    /// Day of the last successful recompute. `None` until the first pass.
    pub day_key: Option<NaiveDate>,

    #[serde(default)]
    pub tenants: BTreeMap<String, TenantConfig>,

    /// Entries keyed by canonical riot id.
    #[serde(default)]
    pub entries: BTreeMap<String, DailyScoreEntry>,
}

impl LeaderboardSnapshot {
    /// Whether the snapshot's day key no longer matches the given day.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.day_key != Some(today)
    }

    /// Entries ranked descending by points. Ties keep the deterministic
    /// key-order iteration of the entry map (stable sort).
    pub fn ranked(&self) -> Vec<(&str, &DailyScoreEntry)> {
        let mut ranked: Vec<(&str, &DailyScoreEntry)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        ranked.sort_by(|a, b| b.1.points.cmp(&a.1.points));
        ranked
    }
}

/// One row of a tenant-scoped ranked view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based rank within the tenant's filtered view.
    pub rank: usize,
    pub label: String,
    pub points: i64,
    pub wins: u32,
    pub kills: u32,
}
