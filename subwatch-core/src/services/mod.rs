//! Business logic service layer

mod locks;
mod scan_coordinator;
mod subdomain_service;
mod target_service;

pub use locks::{TargetGuard, TargetLocks};
pub use scan_coordinator::{next_tick, ScanCoordinator, MAX_SCAN_RUN_PAGE};
pub use subdomain_service::SubdomainService;
pub use target_service::TargetService;

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::traits::{ScanNotifier, ScanRunRepository, SubdomainRepository, TargetRepository};
use crate::types::Target;

/// Service context - holds all dependencies
///
/// The platform layer creates this context and injects its storage
/// implementations. The per-target lock registry lives here so that every
/// service touching a target serializes on the same guard.
pub struct ServiceContext {
    target_repository: Arc<dyn TargetRepository>,
    subdomain_repository: Arc<dyn SubdomainRepository>,
    scan_run_repository: Arc<dyn ScanRunRepository>,
    notifier: Arc<dyn ScanNotifier>,
    locks: TargetLocks,
}

impl ServiceContext {
    /// Create service context
    #[must_use]
    pub fn new(
        target_repository: Arc<dyn TargetRepository>,
        subdomain_repository: Arc<dyn SubdomainRepository>,
        scan_run_repository: Arc<dyn ScanRunRepository>,
        notifier: Arc<dyn ScanNotifier>,
    ) -> Self {
        Self {
            target_repository,
            subdomain_repository,
            scan_run_repository,
            notifier,
            locks: TargetLocks::new(),
        }
    }

    #[must_use]
    pub fn target_repository(&self) -> &Arc<dyn TargetRepository> {
        &self.target_repository
    }

    #[must_use]
    pub fn subdomain_repository(&self) -> &Arc<dyn SubdomainRepository> {
        &self.subdomain_repository
    }

    #[must_use]
    pub fn scan_run_repository(&self) -> &Arc<dyn ScanRunRepository> {
        &self.scan_run_repository
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn ScanNotifier> {
        &self.notifier
    }

    #[must_use]
    pub fn locks(&self) -> &TargetLocks {
        &self.locks
    }

    /// Load a target or fail with `TargetNotFound`
    pub async fn require_target(&self, target_id: i64) -> CoreResult<Target> {
        self.target_repository
            .find_by_id(target_id)
            .await?
            .ok_or(CoreError::TargetNotFound(target_id))
    }
}
