//! Target persistence abstract Trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{NewTarget, Page, ScheduleUpdate, Target};

/// Target repository Trait
///
/// The store is the single source of truth for scan and schedule state.
/// Implementations:
/// - `SqliteStore` (`SeaORM`, subwatch-app)
/// - `MockTargetRepository` (tests)
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Get one page of targets, ordered by ID
    async fn find_page(&self, page: Page) -> CoreResult<Vec<Target>>;

    /// Get target based on ID
    async fn find_by_id(&self, id: i64) -> CoreResult<Option<Target>>;

    /// Get target based on its unique name
    async fn find_by_name(&self, name: &str) -> CoreResult<Option<Target>>;

    /// Insert a new idle, unscheduled target
    ///
    /// Returns `TargetNameTaken` if the name is already used.
    async fn insert(&self, target: &NewTarget) -> CoreResult<Target>;

    /// Replace the user-editable fields
    ///
    /// # Arguments
    /// * `id` - Target ID
    /// * `name` - new name (already validated)
    /// * `url` - new URL or `None` to clear
    async fn update_details(&self, id: i64, name: &str, url: Option<&str>) -> CoreResult<Target>;

    /// Delete the target together with its subdomains and scan runs
    async fn delete(&self, id: i64) -> CoreResult<()>;

    /// Write the schedule fields and return the stored target
    async fn set_schedule(&self, id: i64, update: ScheduleUpdate) -> CoreResult<Target>;

    /// Scheduled targets whose `next_run_time <= now`
    async fn find_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<Target>>;
}
