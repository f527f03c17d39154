//! Target CRUD service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::types::{
    CreateTargetRequest, NewTarget, Page, Target, TargetDetails, UpdateTargetRequest,
};
use crate::utils::validation;

use super::ServiceContext;

/// Target management service
pub struct TargetService {
    ctx: Arc<ServiceContext>,
}

impl TargetService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// List targets page by page
    pub async fn list_targets(&self, page: Page) -> CoreResult<Vec<Target>> {
        if page.limit == 0 || page.limit > Page::MAX_LIMIT {
            return Err(CoreError::ValidationError(format!(
                "limit must be between 1 and {}",
                Page::MAX_LIMIT
            )));
        }
        self.ctx.target_repository().find_page(page).await
    }

    /// Get a target with its subdomains (newest first)
    pub async fn get_target_details(&self, id: i64) -> CoreResult<TargetDetails> {
        let target = self.ctx.require_target(id).await?;
        let subdomains = self.ctx.subdomain_repository().find_by_target(id).await?;
        Ok(TargetDetails { target, subdomains })
    }

    /// Create a new idle, unscheduled target
    pub async fn create_target(&self, request: CreateTargetRequest) -> CoreResult<Target> {
        let name = validation::target_name(&request.name)?;
        let url = validation::optional_http_url(request.url.as_deref())?;

        if self
            .ctx
            .target_repository()
            .find_by_name(&name)
            .await?
            .is_some()
        {
            return Err(CoreError::TargetNameTaken(name));
        }

        let target = self
            .ctx
            .target_repository()
            .insert(&NewTarget { name, url })
            .await?;
        log::info!("Target created: {} ({})", target.name, target.id);
        Ok(target)
    }

    /// Rename a target or change its URL
    ///
    /// An empty `url` clears it; absent fields keep their value.
    pub async fn update_target(&self, id: i64, request: UpdateTargetRequest) -> CoreResult<Target> {
        let name = request
            .name
            .as_deref()
            .map(validation::target_name)
            .transpose()?;
        let url = request
            .url
            .as_deref()
            .map(|u| validation::optional_http_url(Some(u)))
            .transpose()?;

        let _guard = self.ctx.locks().acquire(id).await;
        let current = self.ctx.require_target(id).await?;

        if let Some(ref new_name) = name {
            if *new_name != current.name {
                if let Some(other) = self.ctx.target_repository().find_by_name(new_name).await? {
                    if other.id != id {
                        return Err(CoreError::TargetNameTaken(new_name.clone()));
                    }
                }
            }
        }

        let name = name.unwrap_or(current.name);
        let url = url.unwrap_or(current.url);
        self.ctx
            .target_repository()
            .update_details(id, &name, url.as_deref())
            .await
    }

    /// Delete a target, its subdomains and its scan history
    pub async fn delete_target(&self, id: i64) -> CoreResult<()> {
        let _guard = self.ctx.locks().acquire(id).await;
        let target = self.ctx.require_target(id).await?;
        self.ctx.target_repository().delete(id).await?;
        log::info!("Target deleted: {} ({id})", target.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_context;
    use crate::types::ScanStatus;

    fn create(name: &str, url: Option<&str>) -> CreateTargetRequest {
        CreateTargetRequest {
            name: name.to_string(),
            url: url.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn create_starts_idle_and_unscheduled() {
        let (ctx, _, _) = create_test_context();
        let service = TargetService::new(ctx);

        let target = service
            .create_target(create("  acme ", Some("https://acme.test")))
            .await
            .unwrap();
        assert_eq!(target.name, "acme");
        assert_eq!(target.url.as_deref(), Some("https://acme.test"));
        assert_eq!(target.scan_status, ScanStatus::Idle);
        assert!(!target.is_scheduled);
        assert_eq!(target.next_run_time, None);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let (ctx, _, _) = create_test_context();
        let service = TargetService::new(ctx);

        service.create_target(create("acme", None)).await.unwrap();
        let err = service.create_target(create("acme", None)).await.unwrap_err();
        assert!(matches!(err, CoreError::TargetNameTaken(name) if name == "acme"));
    }

    #[tokio::test]
    async fn create_validates_before_writing() {
        let (ctx, store, _) = create_test_context();
        let service = TargetService::new(ctx);

        assert!(service.create_target(create("", None)).await.is_err());
        assert!(service
            .create_target(create("acme", Some("ftp://acme.test")))
            .await
            .is_err());
        assert_eq!(store.target_count().await, 0);
    }

    #[tokio::test]
    async fn list_enforces_page_limit() {
        let (ctx, store, _) = create_test_context();
        let service = TargetService::new(ctx);
        for name in ["a", "b", "c"] {
            store.seed_target(name).await;
        }

        let page = service
            .list_targets(Page {
                offset: 1,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "b");

        let err = service
            .list_targets(Page {
                offset: 0,
                limit: 101,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[tokio::test]
    async fn details_include_subdomains() {
        let (ctx, store, _) = create_test_context();
        let service = TargetService::new(ctx);
        let target = store.seed_target("acme").await;
        store.seed_subdomain(target.id, "https://dev.acme.test").await;

        let details = service.get_target_details(target.id).await.unwrap();
        assert_eq!(details.target.id, target.id);
        assert_eq!(details.subdomains.len(), 1);

        assert!(matches!(
            service.get_target_details(999).await.unwrap_err(),
            CoreError::TargetNotFound(999)
        ));
    }

    #[tokio::test]
    async fn update_keeps_absent_fields_and_clears_blank_url() {
        let (ctx, _, _) = create_test_context();
        let service = TargetService::new(ctx);
        let target = service
            .create_target(create("acme", Some("https://acme.test")))
            .await
            .unwrap();

        let renamed = service
            .update_target(
                target.id,
                UpdateTargetRequest {
                    name: Some("acme-prod".to_string()),
                    url: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "acme-prod");
        assert_eq!(renamed.url.as_deref(), Some("https://acme.test"));

        let cleared = service
            .update_target(
                target.id,
                UpdateTargetRequest {
                    name: None,
                    url: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.url, None);
    }

    #[tokio::test]
    async fn update_rejects_name_of_other_target() {
        let (ctx, store, _) = create_test_context();
        let service = TargetService::new(ctx);
        store.seed_target("acme").await;
        let other = store.seed_target("globex").await;

        let err = service
            .update_target(
                other.id,
                UpdateTargetRequest {
                    name: Some("acme".to_string()),
                    url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Renaming to its own name is fine
        service
            .update_target(
                other.id,
                UpdateTargetRequest {
                    name: Some("globex".to_string()),
                    url: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_and_releases_lock() {
        let (ctx, store, _) = create_test_context();
        let service = TargetService::new(Arc::clone(&ctx));
        let target = store.seed_target("acme").await;
        store.seed_subdomain(target.id, "https://dev.acme.test").await;

        service.delete_target(target.id).await.unwrap();
        assert_eq!(store.target_count().await, 0);
        assert!(store.subdomains_for(target.id).await.is_empty());
        assert!(ctx.locks().is_empty());

        assert!(matches!(
            service.delete_target(target.id).await.unwrap_err(),
            CoreError::TargetNotFound(_)
        ));
        assert!(ctx.locks().is_empty());
    }
}
