//! Background schedule runner.
//!
//! Wakes up every poll interval, fires due schedule ticks and expires scans
//! that have been running for too long.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use subwatch_core::error::CoreResult;
use subwatch_core::services::ScanCoordinator;
use subwatch_core::types::TickReport;

/// Schedule runner settings
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Time between two passes
    pub poll_interval: Duration,
    /// Running scans older than this are closed as timed out
    pub scan_timeout: chrono::Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            scan_timeout: chrono::Duration::minutes(120),
        }
    }
}

/// Drives `ScanCoordinator::run_due_ticks` and the stuck-scan watchdog.
pub struct ScheduleRunner {
    coordinator: Arc<ScanCoordinator>,
    settings: SchedulerSettings,
}

impl ScheduleRunner {
    #[must_use]
    pub fn new(coordinator: Arc<ScanCoordinator>, settings: SchedulerSettings) -> Self {
        Self {
            coordinator,
            settings,
        }
    }

    /// One scheduler pass: watchdog first, then due ticks.
    pub async fn run_once(&self) -> CoreResult<TickReport> {
        let now = Utc::now();

        match self
            .coordinator
            .expire_stale_scans(now, self.settings.scan_timeout)
            .await
        {
            Ok(expired) if !expired.is_empty() => {
                log::warn!("Watchdog closed {} stuck scan(s)", expired.len());
            }
            Ok(_) => {}
            Err(e) => log::error!("Watchdog pass failed: {e}"),
        }

        let report = self.coordinator.run_due_ticks(now).await?;
        if !report.is_empty() {
            log::info!(
                "Scheduler pass: {} fired, {} skipped",
                report.fired.len(),
                report.skipped.len()
            );
        }
        Ok(report)
    }

    /// Loop until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Scheduler started (poll interval: {}s, scan timeout: {} min)",
            self.settings.poll_interval.as_secs(),
            self.settings.scan_timeout.num_minutes()
        );

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        log::error!("Scheduler pass failed: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Scheduler stopped");
    }

    /// Run the loop on its own task.
    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
