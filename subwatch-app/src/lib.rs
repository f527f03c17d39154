//! Platform-agnostic application bootstrap for subwatch.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection) and the background runtime (`ScheduleRunner`, `ScanWorker`).

pub mod adapters;
pub mod scheduler;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::services::{ScanCoordinator, ServiceContext, SubdomainService, TargetService};
use subwatch_core::traits::{
    NoopNotifier, ScanNotifier, ScanRunRepository, Scanner, SubdomainRepository,
    TargetRepository,
};

pub use scheduler::{ScheduleRunner, SchedulerSettings};
pub use worker::ScanWorker;

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. Every frontend constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (holds all storage adapters)
    pub ctx: Arc<ServiceContext>,
    /// Target service
    pub target_service: TargetService,
    /// Subdomain service
    pub subdomain_service: SubdomainService,
    /// Scan/schedule coordinator, shared with the background tasks
    pub coordinator: Arc<ScanCoordinator>,
}

impl AppState {
    /// Start the scheduler loop and, if a scanner is given, the built-in worker.
    ///
    /// Both tasks stop when `true` is sent on the returned channel's sender or
    /// the sender is dropped.
    #[must_use]
    pub fn start_background(
        &self,
        scheduler: SchedulerSettings,
        worker: Option<(Arc<dyn Scanner>, Duration)>,
    ) -> BackgroundTasks {
        let (shutdown, rx) = watch::channel(false);
        let mut handles =
            vec![ScheduleRunner::new(Arc::clone(&self.coordinator), scheduler).spawn(rx.clone())];

        if let Some((scanner, poll_interval)) = worker {
            handles.push(
                ScanWorker::new(Arc::clone(&self.coordinator), scanner, poll_interval).spawn(rx),
            );
        } else {
            log::info!("Built-in scan worker disabled; waiting for external completion reports");
        }

        BackgroundTasks { shutdown, handles }
    }
}

/// Handles of the running background tasks.
pub struct BackgroundTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Signal every task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("Background task ended abnormally: {e}");
            }
        }
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `target_repository`
/// - `subdomain_repository`
/// - `scan_run_repository`
///
/// # Optional
/// - `notifier`: defaults to `NoopNotifier`
pub struct AppStateBuilder {
    target_repository: Option<Arc<dyn TargetRepository>>,
    subdomain_repository: Option<Arc<dyn SubdomainRepository>>,
    scan_run_repository: Option<Arc<dyn ScanRunRepository>>,
    notifier: Option<Arc<dyn ScanNotifier>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_repository: None,
            subdomain_repository: None,
            scan_run_repository: None,
            notifier: None,
        }
    }

    #[must_use]
    pub fn target_repository(mut self, repo: Arc<dyn TargetRepository>) -> Self {
        self.target_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn subdomain_repository(mut self, repo: Arc<dyn SubdomainRepository>) -> Self {
        self.subdomain_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn scan_run_repository(mut self, repo: Arc<dyn ScanRunRepository>) -> Self {
        self.scan_run_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn ScanNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use one store for all three repositories.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: TargetRepository + SubdomainRepository + ScanRunRepository + 'static,
    {
        self.target_repository(Arc::clone(&store) as Arc<dyn TargetRepository>)
            .subdomain_repository(Arc::clone(&store) as Arc<dyn SubdomainRepository>)
            .scan_run_repository(store as Arc<dyn ScanRunRepository>)
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub fn build(self) -> CoreResult<AppState> {
        let target_repository = self.target_repository.ok_or_else(|| {
            CoreError::ValidationError("target_repository is required".to_string())
        })?;
        let subdomain_repository = self.subdomain_repository.ok_or_else(|| {
            CoreError::ValidationError("subdomain_repository is required".to_string())
        })?;
        let scan_run_repository = self.scan_run_repository.ok_or_else(|| {
            CoreError::ValidationError("scan_run_repository is required".to_string())
        })?;
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier));

        let ctx = Arc::new(ServiceContext::new(
            target_repository,
            subdomain_repository,
            scan_run_repository,
            notifier,
        ));

        Ok(AppState {
            target_service: TargetService::new(Arc::clone(&ctx)),
            subdomain_service: SubdomainService::new(Arc::clone(&ctx)),
            coordinator: Arc::new(ScanCoordinator::new(Arc::clone(&ctx))),
            ctx,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
