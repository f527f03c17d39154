//! Built-in scan worker.
//!
//! Claims queued scans one at a time, runs the configured [`Scanner`] and
//! reports the outcome back through the coordinator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use subwatch_core::error::CoreResult;
use subwatch_core::services::ScanCoordinator;
use subwatch_core::traits::Scanner;
use subwatch_core::types::{CompletionReport, ScanOutcome};

/// Pulls queued scans and executes them.
pub struct ScanWorker {
    coordinator: Arc<ScanCoordinator>,
    scanner: Arc<dyn Scanner>,
    poll_interval: Duration,
}

impl ScanWorker {
    #[must_use]
    pub fn new(
        coordinator: Arc<ScanCoordinator>,
        scanner: Arc<dyn Scanner>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            scanner,
            poll_interval,
        }
    }

    /// Claim and execute the oldest queued scan.
    ///
    /// Returns `Ok(None)` when the queue is empty. A scanner error becomes a
    /// `failed` outcome, not an error of this call.
    pub async fn run_once(&self) -> CoreResult<Option<CompletionReport>> {
        let Some((run, target)) = self.coordinator.claim_next_scan(Utc::now()).await? else {
            return Ok(None);
        };

        let outcome = match self.scanner.scan(&target).await {
            Ok(subdomains) => ScanOutcome::Succeeded { subdomains },
            Err(e) => {
                log::warn!("Scan {} of {} failed: {e}", run.id, target.name);
                ScanOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.coordinator
            .complete_scan(target.id, Some(run.id), outcome)
            .await
            .map(Some)
    }

    /// Drain the queue.
    async fn drain(&self) {
        loop {
            match self.run_once().await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    log::error!("Scan worker pass failed: {e}");
                    break;
                }
            }
        }
    }

    /// Loop until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Scan worker started (poll interval: {}s)",
            self.poll_interval.as_secs()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.drain().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Scan worker stopped");
    }

    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
