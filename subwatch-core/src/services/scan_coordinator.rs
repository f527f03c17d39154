//! Scan and schedule coordinator
//!
//! Owns every transition of `Target.scan_status` and of the schedule fields:
//! manual dispatch, schedule enable/disable, due ticks, worker claims,
//! completion reports and the stuck-scan watchdog. Each transition runs under
//! the target's lock from [`super::TargetLocks`] and relies on the store's
//! compare-and-set primitives, so two racing requests can never both observe
//! `idle` and queue a scan.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    CompletionReport, DispatchReceipt, ScanClosure, ScanOutcome, ScanRun, ScanRunStatus,
    ScanStatus, ScanTrigger, ScheduleState, ScheduleUpdate, Target, TickOutcome, TickReport,
};
use crate::utils::datetime::{plus_minutes, truncate_millis};
use crate::utils::validation;

use super::ServiceContext;

/// Largest scan run history page
pub const MAX_SCAN_RUN_PAGE: u64 = 100;

/// Next tick after `tick_at` fired.
///
/// Normally `tick_at + waiting_minutes`. If that is not in the future (the
/// process was down for longer than one interval) the cadence restarts from
/// `now`, so missed ticks are never replayed.
#[must_use]
pub fn next_tick(tick_at: DateTime<Utc>, waiting_minutes: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let next = plus_minutes(tick_at, waiting_minutes);
    if next > now {
        next
    } else {
        plus_minutes(now, waiting_minutes)
    }
}

/// Scan/schedule coordinator
pub struct ScanCoordinator {
    ctx: Arc<ServiceContext>,
}

impl ScanCoordinator {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    // ===== Dispatch =====

    /// Request an on-demand scan
    ///
    /// Rejected with `ScanInProgress` when the target is not idle.
    pub async fn dispatch_scan(&self, target_id: i64) -> CoreResult<DispatchReceipt> {
        let _guard = self.ctx.locks().acquire(target_id).await;

        let target = self.ctx.require_target(target_id).await?;
        if target.scan_status.is_outstanding() {
            return Err(CoreError::ScanInProgress {
                target_id,
                status: target.scan_status,
            });
        }

        match self
            .ctx
            .scan_run_repository()
            .try_enqueue(target_id, ScanTrigger::Manual, Utc::now())
            .await?
        {
            Some(run) => {
                log::info!("Scan {} queued for target {target_id}", run.id);
                Ok(DispatchReceipt {
                    accepted: true,
                    status: ScanStatus::Queued,
                    scan_run_id: run.id,
                })
            }
            // Another process won the store-level compare-and-set.
            None => Err(self.in_progress(target_id).await),
        }
    }

    async fn in_progress(&self, target_id: i64) -> CoreError {
        match self.ctx.target_repository().find_by_id(target_id).await {
            Ok(Some(target)) => CoreError::ScanInProgress {
                target_id,
                status: target.scan_status,
            },
            Ok(None) => CoreError::TargetNotFound(target_id),
            Err(e) => e,
        }
    }

    // ===== Schedule =====

    /// Enable or disable the recurring schedule
    ///
    /// `waiting_minutes` is only read when enabling; when absent the target's
    /// last configured interval is reused.
    pub async fn set_schedule(
        &self,
        target_id: i64,
        enabled: bool,
        waiting_minutes: Option<i64>,
    ) -> CoreResult<ScheduleState> {
        if enabled {
            self.enable_schedule(target_id, waiting_minutes).await
        } else {
            self.disable_schedule(target_id).await
        }
    }

    /// Arm the recurring cadence
    ///
    /// Arming never queues a scan; the first automatic scan happens at the
    /// first tick. Re-enabling with the current interval keeps the armed
    /// `next_run_time`, a different interval re-arms from now.
    pub async fn enable_schedule(
        &self,
        target_id: i64,
        waiting_minutes: Option<i64>,
    ) -> CoreResult<ScheduleState> {
        let requested = waiting_minutes
            .map(|m| validation::waiting_minutes(Some(m)))
            .transpose()?;

        let _guard = self.ctx.locks().acquire(target_id).await;
        let target = self.ctx.require_target(target_id).await?;
        let minutes = requested.unwrap_or(target.waiting_minutes);

        if target.is_scheduled && target.waiting_minutes == minutes && target.next_run_time.is_some()
        {
            log::debug!("Schedule of target {target_id} already armed every {minutes} min");
            return Ok(target.schedule());
        }

        let next_run_time = plus_minutes(truncate_millis(Utc::now()), minutes);
        let stored = self
            .ctx
            .target_repository()
            .set_schedule(target_id, ScheduleUpdate::armed(minutes, next_run_time))
            .await?;

        log::info!("Schedule of target {target_id} armed every {minutes} min, next run at {next_run_time}");
        Ok(stored.schedule())
    }

    /// Cancel future ticks
    ///
    /// An outstanding scan is left alone.
    pub async fn disable_schedule(&self, target_id: i64) -> CoreResult<ScheduleState> {
        let _guard = self.ctx.locks().acquire(target_id).await;
        let target = self.ctx.require_target(target_id).await?;

        if !target.is_scheduled && target.next_run_time.is_none() {
            return Ok(target.schedule());
        }

        let stored = self
            .ctx
            .target_repository()
            .set_schedule(target_id, ScheduleUpdate::disabled(target.waiting_minutes))
            .await?;

        log::info!("Schedule of target {target_id} disabled");
        Ok(stored.schedule())
    }

    // ===== Ticks =====

    /// Process every schedule whose tick has been reached
    ///
    /// Each due target gets its `next_run_time` advanced; a scan is queued only
    /// when the target is idle, otherwise the tick is dropped. Failures are
    /// scoped to a single target and logged.
    pub async fn run_due_ticks(&self, now: DateTime<Utc>) -> CoreResult<TickReport> {
        let due = self.ctx.target_repository().find_due(now).await?;
        let mut report = TickReport::default();

        for candidate in due {
            match self.tick_target(candidate.id, now).await {
                Ok(Some(true)) => report.fired.push(candidate.id),
                Ok(Some(false)) => report.skipped.push(candidate.id),
                Ok(None) => {}
                Err(e) => log::error!("Tick failed for target {}: {e}", candidate.id),
            }
        }

        Ok(report)
    }

    /// `Some(true)` fired, `Some(false)` skipped, `None` no longer due.
    async fn tick_target(&self, target_id: i64, now: DateTime<Utc>) -> CoreResult<Option<bool>> {
        let _guard = self.ctx.locks().acquire(target_id).await;

        // Re-read under the lock: the schedule may have been disabled or re-armed.
        let Some(target) = self.ctx.target_repository().find_by_id(target_id).await? else {
            return Ok(None);
        };
        let Some(tick_at) = target.next_run_time.filter(|_| target.is_due(now)) else {
            return Ok(None);
        };

        let next = next_tick(tick_at, target.waiting_minutes, now);
        match self
            .ctx
            .scan_run_repository()
            .fire_tick(target_id, tick_at, next, now)
            .await?
        {
            TickOutcome::Stale => Ok(None),
            TickOutcome::Skipped => {
                log::info!(
                    "Tick for target {target_id} dropped, scan still outstanding; next run at {next}"
                );
                Ok(Some(false))
            }
            TickOutcome::Fired(run) => {
                log::info!("Scheduled scan {} queued for target {target_id}; next run at {next}", run.id);
                Ok(Some(true))
            }
        }
    }

    // ===== Worker side =====

    /// Claim the oldest queued scan for a worker
    pub async fn claim_next_scan(&self, now: DateTime<Utc>) -> CoreResult<Option<(ScanRun, Target)>> {
        let Some(candidate) = self.ctx.scan_run_repository().find_next_queued().await? else {
            return Ok(None);
        };

        let _guard = self.ctx.locks().acquire(candidate.target_id).await;
        let Some(run) = self
            .ctx
            .scan_run_repository()
            .mark_running(candidate.id, now)
            .await?
        else {
            return Ok(None);
        };

        let target = self.ctx.require_target(run.target_id).await?;
        log::info!("Scan {} started for target {}", run.id, target.name);
        Ok(Some((run, target)))
    }

    /// Apply a worker's completion report
    ///
    /// Merges discovered subdomains, closes the outstanding run and returns the
    /// target to idle, all in one store transaction. With `run_id` the report
    /// only applies to that run; a late report for a run that was already
    /// closed (for example by the watchdog) is rejected with
    /// `NoScanOutstanding` and never touches a newer run. New findings are
    /// passed to the notifier afterwards; notifier failures are logged, never
    /// returned.
    pub async fn complete_scan(
        &self,
        target_id: i64,
        run_id: Option<i64>,
        outcome: ScanOutcome,
    ) -> CoreResult<CompletionReport> {
        let guard = self.ctx.locks().acquire(target_id).await;

        let target = self.ctx.require_target(target_id).await?;
        let run = self
            .ctx
            .scan_run_repository()
            .find_outstanding(target_id)
            .await?
            .filter(|run| run_id.is_none_or(|id| id == run.id))
            .ok_or(CoreError::NoScanOutstanding(target_id))?;

        let finished_at = Utc::now();
        let (found, closure) = match outcome {
            ScanOutcome::Succeeded { subdomains } => {
                let closure = ScanClosure {
                    status: ScanRunStatus::Succeeded,
                    error: None,
                    discovered_count: u32::try_from(subdomains.len()).unwrap_or(u32::MAX),
                    finished_at,
                };
                (subdomains, closure)
            }
            ScanOutcome::Failed { error } => {
                let closure = ScanClosure {
                    status: ScanRunStatus::Failed,
                    error: Some(error),
                    discovered_count: 0,
                    finished_at,
                };
                (Vec::new(), closure)
            }
        };

        let (run, new_subdomains) = self
            .ctx
            .scan_run_repository()
            .complete(run.id, &found, &closure)
            .await?
            .ok_or(CoreError::NoScanOutstanding(target_id))?;
        drop(guard);

        log::info!(
            "Scan {} for target {target_id} finished as {} ({} new subdomains)",
            run.id,
            run.status,
            new_subdomains.len()
        );

        if !new_subdomains.is_empty() {
            if let Err(e) = self
                .ctx
                .notifier()
                .notify_new_subdomains(&target, &new_subdomains)
                .await
            {
                log::warn!("Failed to send alert for target {target_id}: {e}");
            }
        }

        Ok(CompletionReport {
            run,
            status: ScanStatus::Idle,
            new_subdomains,
        })
    }

    /// Force stuck scans back to idle
    ///
    /// Runs that have been `running` for longer than `timeout` are closed as
    /// `timed_out` with a failure record.
    pub async fn expire_stale_scans(
        &self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> CoreResult<Vec<ScanRun>> {
        let stale = self
            .ctx
            .scan_run_repository()
            .find_stale_running(now - timeout)
            .await?;
        let mut expired = Vec::with_capacity(stale.len());

        for run in stale {
            let _guard = self.ctx.locks().acquire(run.target_id).await;
            let closure = ScanClosure {
                status: ScanRunStatus::TimedOut,
                error: Some(format!(
                    "scan exceeded {} minutes without reporting completion",
                    timeout.num_minutes()
                )),
                discovered_count: 0,
                finished_at: now,
            };
            match self.ctx.scan_run_repository().close(run.id, &closure).await {
                Ok(Some(closed)) => {
                    log::warn!("Scan {} for target {} timed out", closed.id, closed.target_id);
                    expired.push(closed);
                }
                Ok(None) => {}
                Err(e) => log::error!("Failed to expire scan {}: {e}", run.id),
            }
        }

        Ok(expired)
    }

    // ===== History =====

    /// Recent scan runs of a target, newest first
    pub async fn list_scan_runs(&self, target_id: i64, limit: u64) -> CoreResult<Vec<ScanRun>> {
        if limit == 0 || limit > MAX_SCAN_RUN_PAGE {
            return Err(CoreError::ValidationError(format!(
                "limit must be between 1 and {MAX_SCAN_RUN_PAGE}"
            )));
        }
        self.ctx.require_target(target_id).await?;
        self.ctx
            .scan_run_repository()
            .find_by_target(target_id, limit)
            .await
    }
}
