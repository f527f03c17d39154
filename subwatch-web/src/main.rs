use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use subwatch_app::adapters::PassiveScanner;
use subwatch_core::traits::Scanner;
use subwatch_web::config::AppConfig;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = subwatch_web::logging::init(&config.log)?;
    info!("Starting subwatch {}", env!("CARGO_PKG_VERSION"));

    let state = web::Data::new(subwatch_web::build_state(&config).await?);

    let worker = config.worker.enabled.then(|| {
        (
            Arc::new(PassiveScanner) as Arc<dyn Scanner>,
            config.worker.poll_interval(),
        )
    });
    let background = state.start_background(config.scheduler.settings(), worker);

    let workers = config.server.workers.unwrap_or_else(num_cpus::get);
    let bind = (config.server.host.as_str(), config.server.port);
    info!("Listening on {}:{} ({workers} workers)", bind.0, bind.1);

    let app_state = state.clone();
    let served = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(subwatch_web::configure)
    })
    .workers(workers)
    .bind(bind)
    .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1));

    let result = match served {
        Ok(server) => server.run().await.context("HTTP server failed"),
        Err(e) => Err(e),
    };

    info!("Stopping background tasks");
    background.shutdown().await;
    result
}
