//! Test helper module
//!
//! Provides mock implementations and convenient test factory methods.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::services::{ScanCoordinator, ServiceContext};
use crate::traits::{ScanNotifier, ScanRunRepository, SubdomainRepository, TargetRepository};
use crate::types::{
    DiscoveredSubdomain, NewSubdomain, NewTarget, Page, ScanClosure, ScanRun, ScanRunStatus,
    ScanStatus, ScanTrigger, ScheduleUpdate, Subdomain, Target, TickOutcome,
};
use crate::utils::datetime::truncate_millis;
use crate::utils::validation::DEFAULT_WAITING_MINUTES;

// ===== MockStore =====

#[derive(Default, Clone)]
struct MockState {
    targets: BTreeMap<i64, Target>,
    subdomains: BTreeMap<i64, Subdomain>,
    runs: BTreeMap<i64, ScanRun>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn queue_run(&mut self, target_id: i64, trigger: ScanTrigger, now: DateTime<Utc>) -> ScanRun {
        let id = self.next_id();
        let run = ScanRun {
            id,
            target_id,
            trigger,
            status: ScanRunStatus::Queued,
            queued_at: truncate_millis(now),
            started_at: None,
            finished_at: None,
            error: None,
            discovered_count: 0,
        };
        self.runs.insert(id, run.clone());
        run
    }

    fn merge_discovered(&mut self, target_id: i64, found: &[DiscoveredSubdomain]) -> Vec<Subdomain> {
        let mut inserted = Vec::new();
        for item in found {
            let row = item.to_new_subdomain();
            let known = self
                .subdomains
                .values_mut()
                .find(|s| s.target_id == target_id && s.url == row.url);
            if let Some(existing) = known {
                existing.title = row.title;
                existing.status = row.status;
                continue;
            }
            let id = self.next_id();
            let stored = Subdomain {
                id,
                target_id,
                url: row.url,
                title: row.title,
                status: row.status,
            };
            self.subdomains.insert(id, stored.clone());
            inserted.push(stored);
        }
        inserted
    }

    fn close_run(&mut self, run_id: i64, closure: &ScanClosure) -> Option<ScanRun> {
        let run = self
            .runs
            .get_mut(&run_id)
            .filter(|r| r.status.is_outstanding())?;
        run.status = closure.status;
        run.error.clone_from(&closure.error);
        run.discovered_count = closure.discovered_count;
        run.finished_at = Some(truncate_millis(closure.finished_at));
        let run = run.clone();
        if let Some(target) = self.targets.get_mut(&run.target_id) {
            target.scan_status = ScanStatus::Idle;
        }
        Some(run)
    }
}

/// In-memory store implementing every repository under one lock
///
/// A single write lock per call gives the same atomicity as a store transaction.
pub struct MockStore {
    state: RwLock<MockState>,
    /// If Some, every write returns this error (used to test rollback paths)
    write_error: RwLock<Option<String>>,
    /// If set, `complete` fails after merging, before the run is closed
    fail_close: RwLock<bool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            write_error: RwLock::new(None),
            fail_close: RwLock::new(false),
        }
    }

    pub async fn fail_close(&self, fail: bool) {
        *self.fail_close.write().await = fail;
    }

    pub async fn fail_writes(&self, err: Option<&str>) {
        *self.write_error.write().await = err.map(ToString::to_string);
    }

    async fn check_write(&self) -> CoreResult<()> {
        match *self.write_error.read().await {
            Some(ref msg) => Err(CoreError::StorageError(msg.clone())),
            None => Ok(()),
        }
    }

    pub async fn seed_target(&self, name: &str) -> Target {
        TargetRepository::insert(
            self,
            &NewTarget {
                name: name.to_string(),
                url: Some(format!("https://{name}.test")),
            },
        )
        .await
        .unwrap()
    }

    pub async fn seed_subdomain(&self, target_id: i64, url: &str) -> Subdomain {
        SubdomainRepository::insert(
            self,
            target_id,
            &NewSubdomain {
                url: url.to_string(),
                title: String::new(),
                status: "alive".to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn target(&self, id: i64) -> Target {
        self.state.read().await.targets[&id].clone()
    }

    pub async fn target_count(&self) -> usize {
        self.state.read().await.targets.len()
    }

    pub async fn subdomains_for(&self, target_id: i64) -> Vec<Subdomain> {
        SubdomainRepository::find_by_target(self, target_id)
            .await
            .unwrap()
    }

    pub async fn runs_for(&self, target_id: i64) -> Vec<ScanRun> {
        ScanRunRepository::find_by_target(self, target_id, u64::MAX)
            .await
            .unwrap()
    }
}

#[async_trait]
impl TargetRepository for MockStore {
    async fn find_page(&self, page: Page) -> CoreResult<Vec<Target>> {
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .read()
            .await
            .targets
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> CoreResult<Option<Target>> {
        Ok(self.state.read().await.targets.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<Target>> {
        Ok(self
            .state
            .read()
            .await
            .targets
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn insert(&self, target: &NewTarget) -> CoreResult<Target> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if state.targets.values().any(|t| t.name == target.name) {
            return Err(CoreError::TargetNameTaken(target.name.clone()));
        }
        let now = truncate_millis(Utc::now());
        let id = state.next_id();
        let stored = Target {
            id,
            name: target.name.clone(),
            url: target.url.clone(),
            scan_status: ScanStatus::Idle,
            is_scheduled: false,
            waiting_minutes: DEFAULT_WAITING_MINUTES,
            next_run_time: None,
            created_at: now,
            updated_at: now,
        };
        state.targets.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_details(&self, id: i64, name: &str, url: Option<&str>) -> CoreResult<Target> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let target = state
            .targets
            .get_mut(&id)
            .ok_or(CoreError::TargetNotFound(id))?;
        target.name = name.to_string();
        target.url = url.map(ToString::to_string);
        target.updated_at = truncate_millis(Utc::now());
        Ok(target.clone())
    }

    async fn delete(&self, id: i64) -> CoreResult<()> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        state.targets.remove(&id);
        state.subdomains.retain(|_, s| s.target_id != id);
        state.runs.retain(|_, r| r.target_id != id);
        Ok(())
    }

    async fn set_schedule(&self, id: i64, update: ScheduleUpdate) -> CoreResult<Target> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let target = state
            .targets
            .get_mut(&id)
            .ok_or(CoreError::TargetNotFound(id))?;
        target.is_scheduled = update.is_scheduled;
        target.waiting_minutes = update.waiting_minutes;
        target.next_run_time = update.next_run_time;
        target.updated_at = truncate_millis(Utc::now());
        Ok(target.clone())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<Target>> {
        Ok(self
            .state
            .read()
            .await
            .targets
            .values()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubdomainRepository for MockStore {
    async fn find_by_target(&self, target_id: i64) -> CoreResult<Vec<Subdomain>> {
        Ok(self
            .state
            .read()
            .await
            .subdomains
            .values()
            .rev()
            .filter(|s| s.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, target_id: i64, id: i64) -> CoreResult<Option<Subdomain>> {
        Ok(self
            .state
            .read()
            .await
            .subdomains
            .get(&id)
            .filter(|s| s.target_id == target_id)
            .cloned())
    }

    async fn insert(&self, target_id: i64, subdomain: &NewSubdomain) -> CoreResult<Subdomain> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if !state.targets.contains_key(&target_id) {
            return Err(CoreError::TargetNotFound(target_id));
        }
        let id = state.next_id();
        let stored = Subdomain {
            id,
            target_id,
            url: subdomain.url.clone(),
            title: subdomain.title.clone(),
            status: subdomain.status.clone(),
        };
        state.subdomains.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, subdomain: &Subdomain) -> CoreResult<()> {
        self.check_write().await?;
        self.state
            .write()
            .await
            .subdomains
            .insert(subdomain.id, subdomain.clone());
        Ok(())
    }

    async fn delete(&self, target_id: i64, id: i64) -> CoreResult<()> {
        self.check_write().await?;
        self.state
            .write()
            .await
            .subdomains
            .retain(|_, s| !(s.id == id && s.target_id == target_id));
        Ok(())
    }
}

#[async_trait]
impl ScanRunRepository for MockStore {
    async fn try_enqueue(
        &self,
        target_id: i64,
        trigger: ScanTrigger,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<ScanRun>> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let target = state
            .targets
            .get_mut(&target_id)
            .ok_or(CoreError::TargetNotFound(target_id))?;
        if target.scan_status != ScanStatus::Idle {
            return Ok(None);
        }
        target.scan_status = ScanStatus::Queued;
        let run = state.queue_run(target_id, trigger, now);
        Ok(Some(run))
    }

    async fn fire_tick(
        &self,
        target_id: i64,
        expected: DateTime<Utc>,
        next: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<TickOutcome> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let Some(target) = state
            .targets
            .get_mut(&target_id)
            .filter(|t| t.is_scheduled && t.next_run_time == Some(expected))
        else {
            return Ok(TickOutcome::Stale);
        };
        target.next_run_time = Some(next);
        if target.scan_status != ScanStatus::Idle {
            return Ok(TickOutcome::Skipped);
        }
        target.scan_status = ScanStatus::Queued;
        Ok(TickOutcome::Fired(state.queue_run(
            target_id,
            ScanTrigger::Scheduled,
            now,
        )))
    }

    async fn find_next_queued(&self) -> CoreResult<Option<ScanRun>> {
        Ok(self
            .state
            .read()
            .await
            .runs
            .values()
            .find(|r| r.status == ScanRunStatus::Queued)
            .cloned())
    }

    async fn mark_running(&self, run_id: i64, now: DateTime<Utc>) -> CoreResult<Option<ScanRun>> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let Some(run) = state
            .runs
            .get_mut(&run_id)
            .filter(|r| r.status == ScanRunStatus::Queued)
        else {
            return Ok(None);
        };
        run.status = ScanRunStatus::Running;
        run.started_at = Some(truncate_millis(now));
        let run = run.clone();
        if let Some(target) = state.targets.get_mut(&run.target_id) {
            target.scan_status = ScanStatus::Running;
        }
        Ok(Some(run))
    }

    async fn find_outstanding(&self, target_id: i64) -> CoreResult<Option<ScanRun>> {
        Ok(self
            .state
            .read()
            .await
            .runs
            .values()
            .find(|r| r.target_id == target_id && r.status.is_outstanding())
            .cloned())
    }

    async fn close(&self, run_id: i64, closure: &ScanClosure) -> CoreResult<Option<ScanRun>> {
        self.check_write().await?;
        Ok(self.state.write().await.close_run(run_id, closure))
    }

    async fn complete(
        &self,
        run_id: i64,
        found: &[DiscoveredSubdomain],
        closure: &ScanClosure,
    ) -> CoreResult<Option<(ScanRun, Vec<Subdomain>)>> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let Some(target_id) = state
            .runs
            .get(&run_id)
            .filter(|r| r.status.is_outstanding())
            .map(|r| r.target_id)
        else {
            return Ok(None);
        };

        // Work on a copy; it only replaces the state once every step succeeded.
        let mut txn = state.clone();
        let inserted = txn.merge_discovered(target_id, found);
        if *self.fail_close.read().await {
            return Err(CoreError::StorageError("database is locked".to_string()));
        }
        let run = txn.close_run(run_id, closure);
        *state = txn;
        Ok(run.map(|run| (run, inserted)))
    }

    async fn find_by_target(&self, target_id: i64, limit: u64) -> CoreResult<Vec<ScanRun>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .read()
            .await
            .runs
            .values()
            .rev()
            .filter(|r| r.target_id == target_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_stale_running(&self, started_before: DateTime<Utc>) -> CoreResult<Vec<ScanRun>> {
        Ok(self
            .state
            .read()
            .await
            .runs
            .values()
            .filter(|r| {
                r.status == ScanRunStatus::Running
                    && r.started_at.is_some_and(|s| s < started_before)
            })
            .cloned()
            .collect())
    }
}

// ===== RecordingNotifier =====

/// Records `(target_id, new subdomain count)` for every alert
pub struct RecordingNotifier {
    alerts: RwLock<Vec<(i64, usize)>>,
    fail: RwLock<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            fail: RwLock::new(false),
        }
    }

    pub async fn fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn alerts(&self) -> Vec<(i64, usize)> {
        self.alerts.read().await.clone()
    }
}

#[async_trait]
impl ScanNotifier for RecordingNotifier {
    async fn notify_new_subdomains(&self, target: &Target, found: &[Subdomain]) -> CoreResult<()> {
        if *self.fail.read().await {
            return Err(CoreError::NotificationError("webhook returned 500".to_string()));
        }
        self.alerts.write().await.push((target.id, found.len()));
        Ok(())
    }
}

// ===== Factory methods =====

/// Create a `ServiceContext` backed by a fresh `MockStore`
pub fn create_test_context() -> (Arc<ServiceContext>, Arc<MockStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MockStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = Arc::new(ServiceContext::new(
        Arc::clone(&store) as Arc<dyn TargetRepository>,
        Arc::clone(&store) as Arc<dyn SubdomainRepository>,
        Arc::clone(&store) as Arc<dyn ScanRunRepository>,
        Arc::clone(&notifier) as Arc<dyn ScanNotifier>,
    ));
    (ctx, store, notifier)
}

/// Create a `ScanCoordinator` backed by a fresh `MockStore`
pub fn create_test_coordinator() -> (ScanCoordinator, Arc<MockStore>, Arc<RecordingNotifier>) {
    let (ctx, store, notifier) = create_test_context();
    (ScanCoordinator::new(ctx), store, notifier)
}
