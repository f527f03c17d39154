use actix_web::{web, HttpResponse};
use subwatch_app::AppState;
use subwatch_core::types::{
    Ack, ApiResponse, CreateSubdomainRequest, Subdomain, UpdateSubdomainRequest,
};

use crate::error::ApiResult;

pub async fn list_subdomains(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<ApiResponse<Vec<Subdomain>>>> {
    let subdomains = state
        .subdomain_service
        .list_subdomains(path.into_inner())
        .await?;
    Ok(web::Json(ApiResponse::success(subdomains)))
}

pub async fn create_subdomain(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CreateSubdomainRequest>,
) -> ApiResult<HttpResponse> {
    let subdomain = state
        .subdomain_service
        .create_subdomain(path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(subdomain)))
}

pub async fn update_subdomain(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
    body: web::Json<UpdateSubdomainRequest>,
) -> ApiResult<web::Json<ApiResponse<Subdomain>>> {
    let (target_id, subdomain_id) = path.into_inner();
    let subdomain = state
        .subdomain_service
        .update_subdomain(target_id, subdomain_id, body.into_inner())
        .await?;
    Ok(web::Json(ApiResponse::success(subdomain)))
}

pub async fn delete_subdomain(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> ApiResult<web::Json<ApiResponse<Ack>>> {
    let (target_id, subdomain_id) = path.into_inner();
    state
        .subdomain_service
        .delete_subdomain(target_id, subdomain_id)
        .await?;
    Ok(web::Json(ApiResponse::success(Ack::ok())))
}
