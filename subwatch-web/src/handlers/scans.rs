//! Dispatch, schedule and completion endpoints

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use subwatch_app::AppState;
use subwatch_core::types::{
    ApiResponse, CompletionReport, ScanOutcome, ScanRun, ScheduleState,
};

use crate::error::ApiResult;

const DEFAULT_SCAN_RUN_LIMIT: u64 = 20;

/// `enabled` may be omitted; `?waiting_minutes=15` alone arms the schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    waiting_minutes: Option<i64>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CompleteQuery {
    run_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRunsQuery {
    limit: Option<u64>,
}

/// Queue a manual scan; 202 with the receipt, 409 when one is outstanding.
pub async fn dispatch_scan(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let receipt = state.coordinator.dispatch_scan(path.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(ApiResponse::success(receipt)))
}

pub async fn set_schedule(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ScheduleQuery>,
) -> ApiResult<web::Json<ApiResponse<ScheduleState>>> {
    let schedule = state
        .coordinator
        .set_schedule(path.into_inner(), query.enabled, query.waiting_minutes)
        .await?;
    Ok(web::Json(ApiResponse::success(schedule)))
}

/// Completion report from an external worker.
///
/// `?run_id=` pins the report to the run the worker claimed; 409 once that
/// run has been closed.
pub async fn complete_scan(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<CompleteQuery>,
    body: web::Json<ScanOutcome>,
) -> ApiResult<web::Json<ApiResponse<CompletionReport>>> {
    let report = state
        .coordinator
        .complete_scan(path.into_inner(), query.run_id, body.into_inner())
        .await?;
    Ok(web::Json(ApiResponse::success(report)))
}

pub async fn list_scan_runs(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ScanRunsQuery>,
) -> ApiResult<web::Json<ApiResponse<Vec<ScanRun>>>> {
    let runs = state
        .coordinator
        .list_scan_runs(
            path.into_inner(),
            query.limit.unwrap_or(DEFAULT_SCAN_RUN_LIMIT),
        )
        .await?;
    Ok(web::Json(ApiResponse::success(runs)))
}
