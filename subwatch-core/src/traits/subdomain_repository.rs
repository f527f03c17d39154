//! Subdomain persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{NewSubdomain, Subdomain};

/// Subdomain repository Trait
#[async_trait]
pub trait SubdomainRepository: Send + Sync {
    /// All subdomains of a target, newest first
    async fn find_by_target(&self, target_id: i64) -> CoreResult<Vec<Subdomain>>;

    /// Get one subdomain of a target
    async fn find_by_id(&self, target_id: i64, id: i64) -> CoreResult<Option<Subdomain>>;

    /// Insert a subdomain under a target
    async fn insert(&self, target_id: i64, subdomain: &NewSubdomain) -> CoreResult<Subdomain>;

    /// Overwrite an existing subdomain
    async fn save(&self, subdomain: &Subdomain) -> CoreResult<()>;

    /// Delete one subdomain of a target
    async fn delete(&self, target_id: i64, id: i64) -> CoreResult<()>;
}
