//! Persistent multi-tenant daily leaderboard.
//!
//! The engine owns the leaderboard snapshot: it recomputes per-identity
//! daily scores from fresh match windows, resets entries at day
//! boundaries, and distributes tenant-scoped ranked views. State is
//! reloaded from the store at the start of every pass and persisted after
//! every mutation, so a crash between passes loses nothing.
//!
//! Recompute and distribution never run concurrently; a pass that finds
//! the lock held is skipped, not queued, and the schedule fires again on
//! its next window.

pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::fetch::MatchSource;
use crate::models::{DailyScoreEntry, Identity, RankedEntry, ScoringWeights, TenantConfig};
use crate::storage::{StateStore, StorageError};

/// Errors that can occur during leaderboard passes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
}

/// Failure to deliver a ranked view to a tenant destination.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("destination unreachable: {0}")]
    Unreachable(String),
}

/// Decides whether an external account belongs to a tenant.
#[async_trait]
pub trait MembershipCheck: Send + Sync {
    async fn is_member(&self, tenant_id: &str, external_id: &str) -> bool;
}

/// Membership check that admits everyone. Used when no tenant roster
/// integration is wired up.
pub struct AllowAll;

#[async_trait]
impl MembershipCheck for AllowAll {
    async fn is_member(&self, _tenant_id: &str, _external_id: &str) -> bool {
        true
    }
}

/// Receives rendered ranked views for delivery to tenant destinations.
#[async_trait]
pub trait RankingSink: Send + Sync {
    async fn deliver(
        &self,
        tenant_id: &str,
        destination: &str,
        day: NaiveDate,
        rankings: &[RankedEntry],
    ) -> Result<(), DeliveryError>;
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: ScoringWeights,

    /// Matches fetched per identity during recompute.
    pub window_size: usize,

    /// Ranking cutoff per tenant view.
    pub top_n: usize,

    /// Delay between successive identity fetches.
    pub fetch_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            window_size: 5,
            top_n: 15,
            fetch_delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of one recompute pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Identities whose entry was refreshed this pass.
    pub refreshed: usize,

    /// Identities kept at their prior entry because the fetch failed.
    pub kept_stale: usize,

    /// Whether the pass crossed a day boundary and cleared entries.
    pub day_reset: bool,
}

/// Outcome of one distribution pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub delivered: usize,
    pub skipped_empty: usize,
    pub failures: usize,
}

/// The leaderboard engine.
pub struct LeaderboardEngine {
    store: Arc<dyn StateStore>,
    source: Arc<dyn MatchSource>,
    config: EngineConfig,

    // Serializes recompute and distribution passes.
    pass_lock: Mutex<()>,
}

impl LeaderboardEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        source: Arc<dyn MatchSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    /// Recompute every tracked identity's daily score for `today`.
    ///
    /// Crossing a day boundary clears all entries before scoring. Each
    /// identity's entry is overwritten with a fresh accumulation over the
    /// day's matches; a failed fetch keeps the prior entry untouched, and
    /// an identity with no matches today gets an explicit zero entry.
    pub async fn recompute(&self, today: NaiveDate) -> Result<RecomputeReport, EngineError> {
        let _guard = self.pass_lock.lock().await;
        self.recompute_locked(today).await
    }

    /// Recompute only if no other pass is running. A held lock skips the
    /// pass entirely rather than queueing it.
    pub async fn scheduled_recompute(
        &self,
        today: NaiveDate,
    ) -> Result<Option<RecomputeReport>, EngineError> {
        match self.pass_lock.try_lock() {
            Ok(_guard) => Ok(Some(self.recompute_locked(today).await?)),
            Err(_) => {
                info!("Recompute skipped: another pass is in progress");
                Ok(None)
            }
        }
    }

    async fn recompute_locked(&self, today: NaiveDate) -> Result<RecomputeReport, EngineError> {
        let mut snapshot = self.store.load_snapshot()?;
        let identities = self.store.load_identities()?;

        let mut report = RecomputeReport::default();

        if snapshot.is_stale(today) {
            info!(
                "Day boundary crossed ({:?} -> {}), clearing {} entries",
                snapshot.day_key,
                today,
                snapshot.entries.len()
            );
            snapshot.entries.clear();
            snapshot.day_key = Some(today);
            report.day_reset = true;
        }

        let mut first = true;
        for (riot_id, identity) in identities.iter() {
            if !first {
                tokio::time::sleep(self.config.fetch_delay).await;
            }
            first = false;

            match self
                .source
                .recent_matches(&identity.name, &identity.tag, self.config.window_size)
                .await
            {
                Ok(matches) => {
                    let entry = self.score_day(&matches, identity, today);
                    debug!("{}: {} points", riot_id, entry.points);
                    snapshot.entries.insert(riot_id.clone(), entry);
                    report.refreshed += 1;
                }
                Err(e) => {
                    // A prior entry stays; never downgrade a known score
                    // to zero on a fetch failure. An identity with no
                    // prior entry still gets a zero entry so it appears
                    // in distributed views.
                    warn!("Fetch failed for {}, keeping prior entry: {}", riot_id, e);
                    snapshot
                        .entries
                        .entry(riot_id.clone())
                        .or_insert_with(|| DailyScoreEntry {
                            linked_external_id: identity.linked_external_id.clone(),
                            ..Default::default()
                        });
                    report.kept_stale += 1;
                }
            }
        }

        self.store.save_snapshot(&snapshot)?;
        info!(
            "Recompute complete: {} refreshed, {} kept stale",
            report.refreshed, report.kept_stale
        );
        Ok(report)
    }

    /// Accumulate one identity's score over the matches played on `today`.
    fn score_day(
        &self,
        matches: &[crate::models::MatchRecord],
        identity: &Identity,
        today: NaiveDate,
    ) -> DailyScoreEntry {
        let weights = self.config.weights;
        let mut points = 0.0f64;
        let mut wins = 0u32;
        let mut kills = 0u32;

        for record in matches {
            if record.played_on() != Some(today) {
                continue;
            }
            let Some(player) = record.find_player(&identity.name, &identity.tag) else {
                continue;
            };

            points += player.stats.kills as f64 * weights.kill;
            points += player.stats.assists as f64 * weights.assist;
            kills += player.stats.kills;

            let won = player
                .side()
                .map(|side| record.side_won(side))
                .unwrap_or(false);
            if won {
                points += weights.win;
                wins += 1;
            }
        }

        DailyScoreEntry {
            points: points.round() as i64,
            wins,
            kills,
            linked_external_id: identity.linked_external_id.clone(),
        }
    }

    /// Distribute ranked views to every configured tenant.
    ///
    /// Tenants are processed independently: a delivery failure for one is
    /// logged and counted, never aborting the rest of the pass.
    pub async fn distribute(
        &self,
        gate: &dyn MembershipCheck,
        sink: &dyn RankingSink,
    ) -> Result<DistributionReport, EngineError> {
        let _guard = self.pass_lock.lock().await;
        self.distribute_locked(None, gate, sink).await
    }

    /// Distribute only if no other pass is running.
    pub async fn scheduled_distribute(
        &self,
        gate: &dyn MembershipCheck,
        sink: &dyn RankingSink,
    ) -> Result<Option<DistributionReport>, EngineError> {
        match self.pass_lock.try_lock() {
            Ok(_guard) => Ok(Some(self.distribute_locked(None, gate, sink).await?)),
            Err(_) => {
                info!("Distribution skipped: another pass is in progress");
                Ok(None)
            }
        }
    }

    /// Distribute to a single tenant.
    pub async fn distribute_to(
        &self,
        tenant_id: &str,
        gate: &dyn MembershipCheck,
        sink: &dyn RankingSink,
    ) -> Result<DistributionReport, EngineError> {
        let _guard = self.pass_lock.lock().await;
        self.distribute_locked(Some(tenant_id), gate, sink).await
    }

    async fn distribute_locked(
        &self,
        only_tenant: Option<&str>,
        gate: &dyn MembershipCheck,
        sink: &dyn RankingSink,
    ) -> Result<DistributionReport, EngineError> {
        let snapshot = self.store.load_snapshot()?;
        let identities = self.store.load_identities()?;

        let Some(day) = snapshot.day_key else {
            info!("No day key yet, nothing to distribute");
            return Ok(DistributionReport::default());
        };

        if let Some(tenant_id) = only_tenant {
            if !snapshot.tenants.contains_key(tenant_id) {
                return Err(EngineError::UnknownTenant(tenant_id.to_string()));
            }
        }

        let ranked = snapshot.ranked();
        let mut report = DistributionReport::default();

        for (tenant_id, tenant) in &snapshot.tenants {
            if let Some(only) = only_tenant {
                if tenant_id != only {
                    continue;
                }
            }

            let mut rankings = Vec::new();
            for (riot_id, entry) in &ranked {
                if !gate.is_member(tenant_id, &entry.linked_external_id).await {
                    continue;
                }
                let label = identities
                    .get(riot_id)
                    .map(|i| i.label())
                    .unwrap_or_else(|| riot_id.to_string());
                rankings.push(RankedEntry {
                    rank: rankings.len() + 1,
                    label,
                    points: entry.points,
                    wins: entry.wins,
                    kills: entry.kills,
                });
                if rankings.len() >= self.config.top_n {
                    break;
                }
            }

            if rankings.is_empty() {
                debug!("Tenant {} has no ranked members, skipping", tenant_id);
                report.skipped_empty += 1;
                continue;
            }

            match sink
                .deliver(tenant_id, &tenant.destination, day, &rankings)
                .await
            {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Delivery to tenant {} failed: {}", tenant_id, e);
                    report.failures += 1;
                }
            }
        }

        info!(
            "Distribution complete: {} delivered, {} empty, {} failed",
            report.delivered, report.skipped_empty, report.failures
        );
        Ok(report)
    }

    /// Register (or reconfigure) a tenant, then bring it up to date with an
    /// ad-hoc recompute and a single-tenant distribution.
    pub async fn register_tenant(
        &self,
        tenant_id: &str,
        destination: &str,
        today: NaiveDate,
        gate: &dyn MembershipCheck,
        sink: &dyn RankingSink,
    ) -> Result<DistributionReport, EngineError> {
        {
            let _guard = self.pass_lock.lock().await;
            let mut snapshot = self.store.load_snapshot()?;
            snapshot.tenants.insert(
                tenant_id.to_string(),
                TenantConfig {
                    destination: destination.to_string(),
                },
            );
            self.store.save_snapshot(&snapshot)?;
            info!("Registered tenant {} -> {}", tenant_id, destination);
        }

        self.recompute(today).await?;
        self.distribute_to(tenant_id, gate, sink).await
    }
}
