//! `TargetRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::traits::TargetRepository;
use subwatch_core::types::{NewTarget, Page, ScanStatus, ScheduleUpdate, Target};
use subwatch_core::utils::datetime::{from_storage, from_storage_opt, to_storage};
use subwatch_core::utils::validation::DEFAULT_WAITING_MINUTES;

use super::entity::{scan_run, subdomain, target};
use super::{is_unique_violation, storage_error, SqliteStore};

impl target::Model {
    /// Convert a `SeaORM` row model into a domain `Target`.
    pub(crate) fn into_target(self) -> CoreResult<Target> {
        let scan_status = self
            .scan_status
            .parse::<ScanStatus>()
            .map_err(CoreError::SerializationError)?;
        let waiting_minutes = u32::try_from(self.waiting_minutes).map_err(|e| {
            CoreError::SerializationError(format!("Invalid waiting_minutes: {e}"))
        })?;

        Ok(Target {
            id: self.id,
            name: self.name,
            url: self.url,
            scan_status,
            is_scheduled: self.is_scheduled,
            waiting_minutes,
            next_run_time: from_storage_opt(self.next_run_time.as_deref(), "next_run_time")?,
            created_at: from_storage(&self.created_at, "created_at")?,
            updated_at: from_storage(&self.updated_at, "updated_at")?,
        })
    }
}

fn minutes_column(minutes: u32) -> CoreResult<i32> {
    i32::try_from(minutes)
        .map_err(|e| CoreError::ValidationError(format!("Invalid waiting_minutes: {e}")))
}

impl SqliteStore {
    async fn load_target(&self, id: i64) -> CoreResult<Target> {
        target::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_error("query target"))?
            .ok_or(CoreError::TargetNotFound(id))?
            .into_target()
    }
}

#[async_trait]
impl TargetRepository for SqliteStore {
    async fn find_page(&self, page: Page) -> CoreResult<Vec<Target>> {
        let rows = target::Entity::find()
            .order_by_asc(target::Column::Id)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await
            .map_err(storage_error("query targets"))?;

        rows.into_iter().map(target::Model::into_target).collect()
    }

    async fn find_by_id(&self, id: i64) -> CoreResult<Option<Target>> {
        let row = target::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(storage_error("query target"))?;

        row.map(target::Model::into_target).transpose()
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<Target>> {
        let row = target::Entity::find()
            .filter(target::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(storage_error("query target"))?;

        row.map(target::Model::into_target).transpose()
    }

    async fn insert(&self, new: &NewTarget) -> CoreResult<Target> {
        let now = to_storage(&Utc::now());
        let active = target::ActiveModel {
            name: Set(new.name.clone()),
            url: Set(new.url.clone()),
            scan_status: Set(ScanStatus::Idle.as_str().to_string()),
            is_scheduled: Set(false),
            waiting_minutes: Set(minutes_column(DEFAULT_WAITING_MINUTES)?),
            next_run_time: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::TargetNameTaken(new.name.clone())
            } else {
                CoreError::StorageError(format!("Failed to insert target: {e}"))
            }
        })?;

        model.into_target()
    }

    async fn update_details(&self, id: i64, name: &str, url: Option<&str>) -> CoreResult<Target> {
        let result = target::Entity::update_many()
            .col_expr(target::Column::Name, Expr::value(name))
            .col_expr(target::Column::Url, Expr::value(url.map(ToString::to_string)))
            .col_expr(target::Column::UpdatedAt, Expr::value(to_storage(&Utc::now())))
            .filter(target::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CoreError::TargetNameTaken(name.to_string())
                } else {
                    CoreError::StorageError(format!("Failed to update target: {e}"))
                }
            })?;

        if result.rows_affected == 0 {
            return Err(CoreError::TargetNotFound(id));
        }
        self.load_target(id).await
    }

    async fn delete(&self, id: i64) -> CoreResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        scan_run::Entity::delete_many()
            .filter(scan_run::Column::TargetId.eq(id))
            .exec(&txn)
            .await
            .map_err(storage_error("delete scan runs"))?;
        subdomain::Entity::delete_many()
            .filter(subdomain::Column::TargetId.eq(id))
            .exec(&txn)
            .await
            .map_err(storage_error("delete subdomains"))?;
        let result = target::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(storage_error("delete target"))?;

        if result.rows_affected == 0 {
            return Err(CoreError::TargetNotFound(id));
        }

        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        Ok(())
    }

    async fn set_schedule(&self, id: i64, update: ScheduleUpdate) -> CoreResult<Target> {
        let result = target::Entity::update_many()
            .col_expr(target::Column::IsScheduled, Expr::value(update.is_scheduled))
            .col_expr(
                target::Column::WaitingMinutes,
                Expr::value(minutes_column(update.waiting_minutes)?),
            )
            .col_expr(
                target::Column::NextRunTime,
                Expr::value(update.next_run_time.as_ref().map(to_storage)),
            )
            .col_expr(target::Column::UpdatedAt, Expr::value(to_storage(&Utc::now())))
            .filter(target::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(storage_error("update schedule"))?;

        if result.rows_affected == 0 {
            return Err(CoreError::TargetNotFound(id));
        }
        self.load_target(id).await
    }

    async fn find_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<Target>> {
        let rows = target::Entity::find()
            .filter(target::Column::IsScheduled.eq(true))
            .filter(target::Column::NextRunTime.is_not_null())
            .filter(target::Column::NextRunTime.lte(to_storage(&now)))
            .order_by_asc(target::Column::NextRunTime)
            .all(&self.db)
            .await
            .map_err(storage_error("query due targets"))?;

        rows.into_iter().map(target::Model::into_target).collect()
    }
}
