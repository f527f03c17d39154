//! Subdomain CRUD service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::types::{
    CreateSubdomainRequest, NewSubdomain, Subdomain, UpdateSubdomainRequest,
    DEFAULT_SUBDOMAIN_STATUS,
};
use crate::utils::validation;

use super::ServiceContext;

/// Manual subdomain management
///
/// Scan findings are merged by [`super::ScanCoordinator::complete_scan`], not here.
pub struct SubdomainService {
    ctx: Arc<ServiceContext>,
}

impl SubdomainService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// All subdomains of a target, newest first
    pub async fn list_subdomains(&self, target_id: i64) -> CoreResult<Vec<Subdomain>> {
        self.ctx.require_target(target_id).await?;
        self.ctx.subdomain_repository().find_by_target(target_id).await
    }

    /// Record a subdomain by hand
    pub async fn create_subdomain(
        &self,
        target_id: i64,
        request: CreateSubdomainRequest,
    ) -> CoreResult<Subdomain> {
        let row = NewSubdomain {
            url: validation::http_url(&request.url)?,
            title: request.title.unwrap_or_default(),
            status: non_blank_status(request.status)
                .unwrap_or_else(|| DEFAULT_SUBDOMAIN_STATUS.to_string()),
        };

        self.ctx.require_target(target_id).await?;
        let subdomain = self
            .ctx
            .subdomain_repository()
            .insert(target_id, &row)
            .await?;
        log::info!("Subdomain {} added to target {target_id}", subdomain.url);
        Ok(subdomain)
    }

    /// Edit a subdomain's url, title or status
    pub async fn update_subdomain(
        &self,
        target_id: i64,
        subdomain_id: i64,
        mut request: UpdateSubdomainRequest,
    ) -> CoreResult<Subdomain> {
        request.url = request
            .url
            .as_deref()
            .map(validation::http_url)
            .transpose()?;
        request.status = non_blank_status(request.status);

        let mut subdomain = self.require_subdomain(target_id, subdomain_id).await?;
        request.apply_to(&mut subdomain);
        self.ctx.subdomain_repository().save(&subdomain).await?;
        Ok(subdomain)
    }

    /// Remove a subdomain
    pub async fn delete_subdomain(&self, target_id: i64, subdomain_id: i64) -> CoreResult<()> {
        self.require_subdomain(target_id, subdomain_id).await?;
        self.ctx
            .subdomain_repository()
            .delete(target_id, subdomain_id)
            .await
    }

    async fn require_subdomain(&self, target_id: i64, subdomain_id: i64) -> CoreResult<Subdomain> {
        self.ctx.require_target(target_id).await?;
        self.ctx
            .subdomain_repository()
            .find_by_id(target_id, subdomain_id)
            .await?
            .ok_or(CoreError::SubdomainNotFound {
                target_id,
                subdomain_id,
            })
    }
}

fn non_blank_status(status: Option<String>) -> Option<String> {
    status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_context;

    fn request(url: &str) -> CreateSubdomainRequest {
        CreateSubdomainRequest {
            url: url.to_string(),
            title: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_fills_defaults() {
        let (ctx, store, _) = create_test_context();
        let service = SubdomainService::new(ctx);
        let target = store.seed_target("acme").await;

        let sub = service
            .create_subdomain(target.id, request("https://dev.acme.test"))
            .await
            .unwrap();
        assert_eq!(sub.target_id, target.id);
        assert_eq!(sub.title, "");
        assert_eq!(sub.status, DEFAULT_SUBDOMAIN_STATUS);
    }

    #[tokio::test]
    async fn create_validates_url_and_target() {
        let (ctx, store, _) = create_test_context();
        let service = SubdomainService::new(ctx);
        let target = store.seed_target("acme").await;

        assert!(matches!(
            service
                .create_subdomain(target.id, request("dev.acme.test"))
                .await
                .unwrap_err(),
            CoreError::ValidationError(_)
        ));
        assert!(matches!(
            service
                .create_subdomain(404, request("https://dev.acme.test"))
                .await
                .unwrap_err(),
            CoreError::TargetNotFound(404)
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (ctx, store, _) = create_test_context();
        let service = SubdomainService::new(ctx);
        let target = store.seed_target("acme").await;
        let first = store.seed_subdomain(target.id, "https://a.acme.test").await;
        let second = store.seed_subdomain(target.id, "https://b.acme.test").await;

        let ids: Vec<i64> = service
            .list_subdomains(target.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_changes_only_present_fields() {
        let (ctx, store, _) = create_test_context();
        let service = SubdomainService::new(ctx);
        let target = store.seed_target("acme").await;
        let sub = store.seed_subdomain(target.id, "https://dev.acme.test").await;

        let updated = service
            .update_subdomain(
                target.id,
                sub.id,
                UpdateSubdomainRequest {
                    status: Some("missing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "missing");
        assert_eq!(updated.url, sub.url);
        assert_eq!(store.subdomains_for(target.id).await[0].status, "missing");
    }

    #[tokio::test]
    async fn subdomain_of_other_target_is_not_found() {
        let (ctx, store, _) = create_test_context();
        let service = SubdomainService::new(ctx);
        let acme = store.seed_target("acme").await;
        let globex = store.seed_target("globex").await;
        let sub = store.seed_subdomain(acme.id, "https://dev.acme.test").await;

        let err = service.delete_subdomain(globex.id, sub.id).await.unwrap_err();
        assert!(matches!(err, CoreError::SubdomainNotFound { .. }));

        service.delete_subdomain(acme.id, sub.id).await.unwrap();
        assert!(store.subdomains_for(acme.id).await.is_empty());
    }
}
