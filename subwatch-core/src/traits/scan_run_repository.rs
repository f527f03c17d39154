//! Scan run persistence abstract Trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{DiscoveredSubdomain, ScanClosure, ScanRun, ScanTrigger, Subdomain, TickOutcome};

/// Scan run repository Trait
///
/// Every method that changes a run also keeps `Target.scan_status` in step,
/// inside the same store transaction.
#[async_trait]
pub trait ScanRunRepository: Send + Sync {
    /// Queue a scan if the target is idle
    ///
    /// Atomically moves the target `idle -> queued` and inserts a queued run.
    ///
    /// # Returns
    /// * `Ok(Some(run))` - dispatched
    /// * `Ok(None)` - the target already has an outstanding scan
    /// * `Err(TargetNotFound)` - no such target
    async fn try_enqueue(
        &self,
        target_id: i64,
        trigger: ScanTrigger,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<ScanRun>>;

    /// Fire one due tick
    ///
    /// In one transaction: move `next_run_time` from `expected` to `next`
    /// (compare-and-set, scheduled targets only), then queue a scheduled run if
    /// the target is idle.
    async fn fire_tick(
        &self,
        target_id: i64,
        expected: DateTime<Utc>,
        next: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<TickOutcome>;

    /// Oldest queued run, without claiming it
    async fn find_next_queued(&self) -> CoreResult<Option<ScanRun>>;

    /// Claim a queued run (`queued -> running` for run and target)
    ///
    /// Returns `Ok(None)` if the run was no longer queued.
    async fn mark_running(&self, run_id: i64, now: DateTime<Utc>) -> CoreResult<Option<ScanRun>>;

    /// The target's queued or running run, if any
    async fn find_outstanding(&self, target_id: i64) -> CoreResult<Option<ScanRun>>;

    /// Close an outstanding run and return its target to idle
    ///
    /// Returns `Ok(None)` if the run was no longer outstanding.
    async fn close(&self, run_id: i64, closure: &ScanClosure) -> CoreResult<Option<ScanRun>>;

    /// Close an outstanding run and merge its findings in one transaction
    ///
    /// Findings are merged by URL: unknown URLs are inserted, known URLs get
    /// title and status refreshed. Nothing is written when the run is no
    /// longer outstanding.
    ///
    /// # Returns
    /// * `Ok(Some((run, inserted)))` - closed run and the subdomains seen for the first time
    /// * `Ok(None)` - the run was no longer outstanding
    async fn complete(
        &self,
        run_id: i64,
        found: &[DiscoveredSubdomain],
        closure: &ScanClosure,
    ) -> CoreResult<Option<(ScanRun, Vec<Subdomain>)>>;

    /// Recent runs of a target, newest first
    async fn find_by_target(&self, target_id: i64, limit: u64) -> CoreResult<Vec<ScanRun>>;

    /// Running runs started before the given instant
    async fn find_stale_running(&self, started_before: DateTime<Utc>) -> CoreResult<Vec<ScanRun>>;
}
