//! Built-in scanner used when no reconnaissance backend is plugged in.

use async_trait::async_trait;

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::traits::Scanner;
use subwatch_core::types::{DiscoveredSubdomain, Target};

/// Scanner that runs the full scan lifecycle but discovers nothing.
///
/// Targets without a URL fail, since there is nothing to scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveScanner;

#[async_trait]
impl Scanner for PassiveScanner {
    async fn scan(&self, target: &Target) -> CoreResult<Vec<DiscoveredSubdomain>> {
        let Some(ref url) = target.url else {
            return Err(CoreError::ValidationError(format!(
                "Target {} has no URL to scan",
                target.name
            )));
        };
        log::debug!("Passive scan of {url} for target {}", target.name);
        Ok(Vec::new())
    }
}
