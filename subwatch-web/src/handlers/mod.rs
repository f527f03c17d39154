//! Route table for `/api/v1`

mod health;
mod scans;
mod subdomains;
mod targets;

use actix_web::web;

/// Register every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .service(
            web::resource("/targets")
                .route(web::get().to(targets::list_targets))
                .route(web::post().to(targets::create_target)),
        )
        .service(
            web::resource("/targets/{id}")
                .route(web::get().to(targets::get_target))
                .route(web::patch().to(targets::update_target))
                .route(web::delete().to(targets::delete_target)),
        )
        .route("/targets/{id}/scan", web::post().to(scans::dispatch_scan))
        .route(
            "/targets/{id}/scan/complete",
            web::post().to(scans::complete_scan),
        )
        .route("/targets/{id}/schedule", web::patch().to(scans::set_schedule))
        .route("/targets/{id}/scans", web::get().to(scans::list_scan_runs))
        .service(
            web::resource("/targets/{id}/subdomains")
                .route(web::get().to(subdomains::list_subdomains))
                .route(web::post().to(subdomains::create_subdomain)),
        )
        .service(
            web::resource("/targets/{id}/subdomains/{subdomain_id}")
                .route(web::patch().to(subdomains::update_subdomain))
                .route(web::delete().to(subdomains::delete_subdomain)),
        );
}
