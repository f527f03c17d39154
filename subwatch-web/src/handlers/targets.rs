//! Target CRUD

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use subwatch_app::AppState;
use subwatch_core::types::{
    Ack, ApiResponse, CreateTargetRequest, Page, Target, TargetDetails, UpdateTargetRequest,
};

use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct ListTargetsQuery {
    offset: Option<u64>,
    limit: Option<u64>,
}

impl ListTargetsQuery {
    fn page(&self) -> Page {
        let default = Page::default();
        Page {
            offset: self.offset.unwrap_or(default.offset),
            limit: self.limit.unwrap_or(default.limit),
        }
    }
}

pub async fn list_targets(
    state: web::Data<AppState>,
    query: web::Query<ListTargetsQuery>,
) -> ApiResult<web::Json<ApiResponse<Vec<Target>>>> {
    let targets = state.target_service.list_targets(query.page()).await?;
    Ok(web::Json(ApiResponse::success(targets)))
}

pub async fn create_target(
    state: web::Data<AppState>,
    body: web::Json<CreateTargetRequest>,
) -> ApiResult<HttpResponse> {
    let target = state.target_service.create_target(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(target)))
}

pub async fn get_target(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<ApiResponse<TargetDetails>>> {
    let details = state
        .target_service
        .get_target_details(path.into_inner())
        .await?;
    Ok(web::Json(ApiResponse::success(details)))
}

pub async fn update_target(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateTargetRequest>,
) -> ApiResult<web::Json<ApiResponse<Target>>> {
    let target = state
        .target_service
        .update_target(path.into_inner(), body.into_inner())
        .await?;
    Ok(web::Json(ApiResponse::success(target)))
}

pub async fn delete_target(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<ApiResponse<Ack>>> {
    state.target_service.delete_target(path.into_inner()).await?;
    Ok(web::Json(ApiResponse::success(Ack::ok())))
}
