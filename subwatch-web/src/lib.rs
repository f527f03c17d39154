//! HTTP front end for subwatch.
//!
//! Wires the SQLite store and the optional Discord notifier into an
//! `AppState` and exposes it under `/api/v1`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

use std::sync::Arc;

use actix_web::web;
use anyhow::Context;
use subwatch_app::adapters::{DiscordNotifier, SqliteStore};
use subwatch_app::{AppState, AppStateBuilder};
use subwatch_core::traits::ScanNotifier;

use crate::config::AppConfig;

/// API prefix
pub const API_SCOPE: &str = "/api/v1";

/// Mount the API scope together with extractor error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .service(web::scope(API_SCOPE).configure(handlers::configure));
}

/// Open the database and assemble the services.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store = SqliteStore::new(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;

    let mut builder = AppStateBuilder::new().store(Arc::new(store));
    if let Some(ref webhook) = config.alert.discord_webhook {
        log::info!("Discord alerts enabled");
        builder = builder.notifier(Arc::new(DiscordNotifier::new(webhook.as_str())) as Arc<dyn ScanNotifier>);
    }

    Ok(builder.build()?)
}
