//! Wall-clock scheduling for leaderboard passes.
//!
//! A one-minute tick checks whether a pass window is due. Windows are
//! level-triggered: each (day, hour) recompute window and each day's
//! distribution window fires at most once, and a window that could not run
//! (another pass held the lock) is skipped rather than queued. The next
//! window fires on schedule regardless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Timelike};
use tracing::{error, info};

use crate::config::ScheduleConfig;
use crate::leaderboard::{LeaderboardEngine, MembershipCheck, RankingSink};

/// Key identifying one hourly recompute window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeWindow {
    pub day: NaiveDate,
    pub hour: u32,
}

/// Recompute window due at this instant, if any.
pub fn recompute_window_at(
    day: NaiveDate,
    hour: u32,
    minute: u32,
    schedule: &ScheduleConfig,
) -> Option<RecomputeWindow> {
    (minute == schedule.recompute_minute).then_some(RecomputeWindow { day, hour })
}

/// Distribution window due at this instant, if any. Keyed by day.
pub fn distribution_window_at(
    day: NaiveDate,
    hour: u32,
    minute: u32,
    schedule: &ScheduleConfig,
) -> Option<NaiveDate> {
    (hour == schedule.distribute_hour && minute == schedule.distribute_minute).then_some(day)
}

/// Runs the recompute and distribution schedule until the task is aborted.
pub struct Scheduler {
    engine: Arc<LeaderboardEngine>,
    gate: Arc<dyn MembershipCheck>,
    sink: Arc<dyn RankingSink>,
    schedule: ScheduleConfig,
}

impl Scheduler {
    pub fn new(
        engine: Arc<LeaderboardEngine>,
        gate: Arc<dyn MembershipCheck>,
        sink: Arc<dyn RankingSink>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            engine,
            gate,
            sink,
            schedule,
        }
    }

    /// Tick once per minute forever.
    pub async fn run(&self) {
        info!(
            "Scheduler started: recompute at :{:02} hourly, distribution at {:02}:{:02}",
            self.schedule.recompute_minute,
            self.schedule.distribute_hour,
            self.schedule.distribute_minute
        );

        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut last_recompute: Option<RecomputeWindow> = None;
        let mut last_distribution: Option<NaiveDate> = None;

        loop {
            interval.tick().await;

            let now = Local::now();
            let day = now.date_naive();
            let (hour, minute) = (now.hour(), now.minute());

            if let Some(window) = recompute_window_at(day, hour, minute, &self.schedule) {
                if last_recompute != Some(window) {
                    // Mark the window consumed whether or not the pass ran;
                    // a skipped window waits for the next hour.
                    last_recompute = Some(window);
                    match self.engine.scheduled_recompute(day).await {
                        Ok(Some(report)) => {
                            info!(
                                "Scheduled recompute done: {} refreshed, {} kept stale",
                                report.refreshed, report.kept_stale
                            );
                        }
                        Ok(None) => {}
                        Err(e) => error!("Scheduled recompute failed: {}", e),
                    }
                }
            }

            if let Some(window_day) = distribution_window_at(day, hour, minute, &self.schedule) {
                if last_distribution != Some(window_day) {
                    last_distribution = Some(window_day);
                    match self
                        .engine
                        .scheduled_distribute(self.gate.as_ref(), self.sink.as_ref())
                        .await
                    {
                        Ok(Some(report)) => {
                            info!(
                                "Scheduled distribution done: {} delivered, {} failed",
                                report.delivered, report.failures
                            );
                        }
                        Ok(None) => {}
                        Err(e) => error!("Scheduled distribution failed: {}", e),
                    }
                }
            }
        }
    }
}
