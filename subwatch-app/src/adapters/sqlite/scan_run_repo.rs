//! `ScanRunRepository` implementation for `SqliteStore`.
//!
//! Each transition updates the run and mirrors it onto `targets.scan_status`
//! inside one transaction. Completion merges the findings in that same
//! transaction, and a scheduled tick advances `next_run_time` in it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::traits::ScanRunRepository;
use subwatch_core::types::{
    DiscoveredSubdomain, ScanClosure, ScanRun, ScanRunStatus, ScanStatus, ScanTrigger, Subdomain,
    TickOutcome,
};
use subwatch_core::utils::datetime::{from_storage, from_storage_opt, to_storage};

use super::entity::{scan_run, target};
use super::subdomain_repo::merge_discovered;
use super::{storage_error, SqliteStore};

const OUTSTANDING: [&str; 2] = ["queued", "running"];

impl scan_run::Model {
    /// Convert a `SeaORM` row model into a domain `ScanRun`.
    fn into_scan_run(self) -> CoreResult<ScanRun> {
        Ok(ScanRun {
            id: self.id,
            target_id: self.target_id,
            trigger: self
                .triggered_by
                .parse::<ScanTrigger>()
                .map_err(CoreError::SerializationError)?,
            status: self
                .status
                .parse::<ScanRunStatus>()
                .map_err(CoreError::SerializationError)?,
            queued_at: from_storage(&self.queued_at, "queued_at")?,
            started_at: from_storage_opt(self.started_at.as_deref(), "started_at")?,
            finished_at: from_storage_opt(self.finished_at.as_deref(), "finished_at")?,
            error: self.error,
            discovered_count: u32::try_from(self.discovered_count).map_err(|e| {
                CoreError::SerializationError(format!("Invalid discovered_count: {e}"))
            })?,
        })
    }
}

/// Conditionally move a target's `scan_status` from `from` to `to`.
async fn mirror_target_status<C: ConnectionTrait>(
    conn: &C,
    target_id: i64,
    from: &[&str],
    to: ScanStatus,
) -> CoreResult<u64> {
    let result = target::Entity::update_many()
        .col_expr(target::Column::ScanStatus, Expr::value(to.as_str()))
        .col_expr(target::Column::UpdatedAt, Expr::value(to_storage(&Utc::now())))
        .filter(target::Column::Id.eq(target_id))
        .filter(target::Column::ScanStatus.is_in(from.iter().copied()))
        .exec(conn)
        .await
        .map_err(storage_error("update target scan status"))?;
    Ok(result.rows_affected)
}

async fn load_run<C: ConnectionTrait>(conn: &C, run_id: i64) -> CoreResult<Option<scan_run::Model>> {
    scan_run::Entity::find_by_id(run_id)
        .one(conn)
        .await
        .map_err(storage_error("query scan run"))
}

async fn insert_queued_run<C: ConnectionTrait>(
    conn: &C,
    target_id: i64,
    trigger: ScanTrigger,
    now: DateTime<Utc>,
) -> CoreResult<scan_run::Model> {
    scan_run::ActiveModel {
        target_id: Set(target_id),
        triggered_by: Set(trigger.as_str().to_string()),
        status: Set(ScanRunStatus::Queued.as_str().to_string()),
        queued_at: Set(to_storage(&now)),
        started_at: Set(None),
        finished_at: Set(None),
        error: Set(None),
        discovered_count: Set(0),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(storage_error("insert scan run"))
}

/// Close a run that is still outstanding and return its target to idle.
///
/// `None` when the run was already closed; nothing is written in that case.
async fn close_outstanding<C: ConnectionTrait>(
    conn: &C,
    run_id: i64,
    closure: &ScanClosure,
) -> CoreResult<Option<scan_run::Model>> {
    let discovered_count = i32::try_from(closure.discovered_count).map_err(|e| {
        CoreError::ValidationError(format!("Invalid discovered_count: {e}"))
    })?;

    let result = scan_run::Entity::update_many()
        .col_expr(scan_run::Column::Status, Expr::value(closure.status.as_str()))
        .col_expr(scan_run::Column::Error, Expr::value(closure.error.clone()))
        .col_expr(
            scan_run::Column::DiscoveredCount,
            Expr::value(discovered_count),
        )
        .col_expr(
            scan_run::Column::FinishedAt,
            Expr::value(to_storage(&closure.finished_at)),
        )
        .filter(scan_run::Column::Id.eq(run_id))
        .filter(scan_run::Column::Status.is_in(OUTSTANDING))
        .exec(conn)
        .await
        .map_err(storage_error("close scan run"))?;
    if result.rows_affected == 0 {
        return Ok(None);
    }

    let Some(model) = load_run(conn, run_id).await? else {
        return Ok(None);
    };
    mirror_target_status(conn, model.target_id, &OUTSTANDING, ScanStatus::Idle).await?;
    Ok(Some(model))
}

#[async_trait]
impl ScanRunRepository for SqliteStore {
    async fn try_enqueue(
        &self,
        target_id: i64,
        trigger: ScanTrigger,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<ScanRun>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        let claimed =
            mirror_target_status(&txn, target_id, &[ScanStatus::Idle.as_str()], ScanStatus::Queued)
                .await?;
        if claimed == 0 {
            let exists = target::Entity::find_by_id(target_id)
                .one(&txn)
                .await
                .map_err(storage_error("query target"))?
                .is_some();
            return if exists {
                Ok(None)
            } else {
                Err(CoreError::TargetNotFound(target_id))
            };
        }

        let model = insert_queued_run(&txn, target_id, trigger, now).await?;

        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        model.into_scan_run().map(Some)
    }

    async fn fire_tick(
        &self,
        target_id: i64,
        expected: DateTime<Utc>,
        next: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<TickOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        let advanced = target::Entity::update_many()
            .col_expr(target::Column::NextRunTime, Expr::value(to_storage(&next)))
            .col_expr(target::Column::UpdatedAt, Expr::value(to_storage(&now)))
            .filter(target::Column::Id.eq(target_id))
            .filter(target::Column::IsScheduled.eq(true))
            .filter(target::Column::NextRunTime.eq(to_storage(&expected)))
            .exec(&txn)
            .await
            .map_err(storage_error("advance schedule"))?;
        if advanced.rows_affected == 0 {
            return Ok(TickOutcome::Stale);
        }

        let claimed =
            mirror_target_status(&txn, target_id, &[ScanStatus::Idle.as_str()], ScanStatus::Queued)
                .await?;
        if claimed == 0 {
            txn.commit()
                .await
                .map_err(storage_error("commit transaction"))?;
            return Ok(TickOutcome::Skipped);
        }

        let model = insert_queued_run(&txn, target_id, ScanTrigger::Scheduled, now).await?;
        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        model.into_scan_run().map(TickOutcome::Fired)
    }

    async fn find_next_queued(&self) -> CoreResult<Option<ScanRun>> {
        let row = scan_run::Entity::find()
            .filter(scan_run::Column::Status.eq(ScanRunStatus::Queued.as_str()))
            .order_by_asc(scan_run::Column::Id)
            .one(&self.db)
            .await
            .map_err(storage_error("query queued scan"))?;

        row.map(scan_run::Model::into_scan_run).transpose()
    }

    async fn mark_running(&self, run_id: i64, now: DateTime<Utc>) -> CoreResult<Option<ScanRun>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        let result = scan_run::Entity::update_many()
            .col_expr(
                scan_run::Column::Status,
                Expr::value(ScanRunStatus::Running.as_str()),
            )
            .col_expr(scan_run::Column::StartedAt, Expr::value(to_storage(&now)))
            .filter(scan_run::Column::Id.eq(run_id))
            .filter(scan_run::Column::Status.eq(ScanRunStatus::Queued.as_str()))
            .exec(&txn)
            .await
            .map_err(storage_error("claim scan run"))?;
        if result.rows_affected == 0 {
            return Ok(None);
        }

        let Some(model) = load_run(&txn, run_id).await? else {
            return Ok(None);
        };
        mirror_target_status(
            &txn,
            model.target_id,
            &[ScanStatus::Queued.as_str()],
            ScanStatus::Running,
        )
        .await?;

        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        model.into_scan_run().map(Some)
    }

    async fn find_outstanding(&self, target_id: i64) -> CoreResult<Option<ScanRun>> {
        let row = scan_run::Entity::find()
            .filter(scan_run::Column::TargetId.eq(target_id))
            .filter(scan_run::Column::Status.is_in(OUTSTANDING))
            .order_by_desc(scan_run::Column::Id)
            .one(&self.db)
            .await
            .map_err(storage_error("query outstanding scan"))?;

        row.map(scan_run::Model::into_scan_run).transpose()
    }

    async fn close(&self, run_id: i64, closure: &ScanClosure) -> CoreResult<Option<ScanRun>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        let Some(model) = close_outstanding(&txn, run_id, closure).await? else {
            return Ok(None);
        };

        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        model.into_scan_run().map(Some)
    }

    async fn complete(
        &self,
        run_id: i64,
        found: &[DiscoveredSubdomain],
        closure: &ScanClosure,
    ) -> CoreResult<Option<(ScanRun, Vec<Subdomain>)>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("begin transaction"))?;

        let Some(run) = load_run(&txn, run_id).await? else {
            return Ok(None);
        };
        let inserted = merge_discovered(&txn, run.target_id, found).await?;

        // Dropping the transaction rolls the merge back.
        let Some(model) = close_outstanding(&txn, run_id, closure).await? else {
            return Ok(None);
        };

        txn.commit()
            .await
            .map_err(storage_error("commit transaction"))?;
        Ok(Some((model.into_scan_run()?, inserted)))
    }

    async fn find_by_target(&self, target_id: i64, limit: u64) -> CoreResult<Vec<ScanRun>> {
        let rows = scan_run::Entity::find()
            .filter(scan_run::Column::TargetId.eq(target_id))
            .order_by_desc(scan_run::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(storage_error("query scan runs"))?;

        rows.into_iter().map(scan_run::Model::into_scan_run).collect()
    }

    async fn find_stale_running(&self, started_before: DateTime<Utc>) -> CoreResult<Vec<ScanRun>> {
        let rows = scan_run::Entity::find()
            .filter(scan_run::Column::Status.eq(ScanRunStatus::Running.as_str()))
            .filter(scan_run::Column::StartedAt.lt(to_storage(&started_before)))
            .order_by_asc(scan_run::Column::Id)
            .all(&self.db)
            .await
            .map_err(storage_error("query stale scans"))?;

        rows.into_iter().map(scan_run::Model::into_scan_run).collect()
    }
}
