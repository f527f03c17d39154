//! Scan worker collaborators

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{DiscoveredSubdomain, Subdomain, Target};

/// Reconnaissance backend run by the scan worker
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan one target and return every subdomain found alive
    async fn scan(&self, target: &Target) -> CoreResult<Vec<DiscoveredSubdomain>>;
}

/// Receives net-new findings after a completed scan
#[async_trait]
pub trait ScanNotifier: Send + Sync {
    async fn notify_new_subdomains(&self, target: &Target, found: &[Subdomain]) -> CoreResult<()>;
}

/// Notifier that drops every alert
///
/// Default when no alert channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ScanNotifier for NoopNotifier {
    async fn notify_new_subdomains(&self, target: &Target, found: &[Subdomain]) -> CoreResult<()> {
        log::debug!(
            "No alert channel configured, dropping {} finding(s) for {}",
            found.len(),
            target.name
        );
        Ok(())
    }
}
