//! `SubdomainRepository` implementation for `SqliteStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::traits::SubdomainRepository;
use subwatch_core::types::{DiscoveredSubdomain, NewSubdomain, Subdomain};

use super::entity::subdomain;
use super::{is_foreign_key_violation, storage_error, SqliteStore};

impl From<subdomain::Model> for Subdomain {
    fn from(model: subdomain::Model) -> Self {
        Self {
            id: model.id,
            target_id: model.target_id,
            url: model.url,
            title: model.title,
            status: model.status,
        }
    }
}

fn new_active_model(target_id: i64, row: &NewSubdomain) -> subdomain::ActiveModel {
    subdomain::ActiveModel {
        target_id: Set(target_id),
        url: Set(row.url.clone()),
        title: Set(row.title.clone()),
        status: Set(row.status.clone()),
        ..Default::default()
    }
}

/// Insert unseen findings and refresh changed ones, returning only the new rows.
///
/// Runs on the caller's connection so completion can merge and close the run
/// in one transaction.
pub(super) async fn merge_discovered<C: ConnectionTrait>(
    conn: &C,
    target_id: i64,
    found: &[DiscoveredSubdomain],
) -> CoreResult<Vec<Subdomain>> {
    if found.is_empty() {
        return Ok(Vec::new());
    }

    let mut known: HashMap<String, subdomain::Model> = subdomain::Entity::find()
        .filter(subdomain::Column::TargetId.eq(target_id))
        .all(conn)
        .await
        .map_err(storage_error("query subdomains"))?
        .into_iter()
        .map(|m| (m.url.clone(), m))
        .collect();

    let mut inserted = Vec::new();
    for item in found {
        let row = item.to_new_subdomain();
        if let Some(existing) = known.get(&row.url) {
            if existing.title == row.title && existing.status == row.status {
                continue;
            }
            let active = subdomain::ActiveModel {
                id: Set(existing.id),
                title: Set(row.title),
                status: Set(row.status),
                ..Default::default()
            };
            let model = active
                .update(conn)
                .await
                .map_err(storage_error("refresh subdomain"))?;
            known.insert(model.url.clone(), model);
            continue;
        }

        let model = new_active_model(target_id, &row)
            .insert(conn)
            .await
            .map_err(storage_error("insert subdomain"))?;
        known.insert(model.url.clone(), model.clone());
        inserted.push(Subdomain::from(model));
    }

    log::debug!(
        "Merged {} finding(s) for target {target_id}: {} new",
        found.len(),
        inserted.len()
    );
    Ok(inserted)
}

#[async_trait]
impl SubdomainRepository for SqliteStore {
    async fn find_by_target(&self, target_id: i64) -> CoreResult<Vec<Subdomain>> {
        let rows = subdomain::Entity::find()
            .filter(subdomain::Column::TargetId.eq(target_id))
            .order_by_desc(subdomain::Column::Id)
            .all(&self.db)
            .await
            .map_err(storage_error("query subdomains"))?;

        Ok(rows.into_iter().map(Subdomain::from).collect())
    }

    async fn find_by_id(&self, target_id: i64, id: i64) -> CoreResult<Option<Subdomain>> {
        let row = subdomain::Entity::find_by_id(id)
            .filter(subdomain::Column::TargetId.eq(target_id))
            .one(&self.db)
            .await
            .map_err(storage_error("query subdomain"))?;

        Ok(row.map(Subdomain::from))
    }

    async fn insert(&self, target_id: i64, row: &NewSubdomain) -> CoreResult<Subdomain> {
        let model = new_active_model(target_id, row)
            .insert(&self.db)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CoreError::TargetNotFound(target_id)
                } else {
                    CoreError::StorageError(format!("Failed to insert subdomain: {e}"))
                }
            })?;

        Ok(model.into())
    }

    async fn save(&self, sub: &Subdomain) -> CoreResult<()> {
        let active = subdomain::ActiveModel {
            id: Set(sub.id),
            target_id: Set(sub.target_id),
            url: Set(sub.url.clone()),
            title: Set(sub.title.clone()),
            status: Set(sub.status.clone()),
        };
        active
            .update(&self.db)
            .await
            .map_err(storage_error("update subdomain"))?;
        Ok(())
    }

    async fn delete(&self, target_id: i64, id: i64) -> CoreResult<()> {
        let result = subdomain::Entity::delete_many()
            .filter(subdomain::Column::Id.eq(id))
            .filter(subdomain::Column::TargetId.eq(target_id))
            .exec(&self.db)
            .await
            .map_err(storage_error("delete subdomain"))?;

        if result.rows_affected == 0 {
            return Err(CoreError::SubdomainNotFound {
                target_id,
                subdomain_id: id,
            });
        }
        Ok(())
    }
}
