//! Subscriber setup.
//!
//! Stdout is human readable unless `log.json` is set. With `log.directory`
//! a daily rotated JSON file is written as well. `log` records from the core
//! and app crates are bridged into tracing.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "subwatch.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if config.json {
        layers.push(fmt::layer().json().boxed());
    } else {
        layers.push(fmt::layer().boxed());
    }

    let guard = if let Some(ref directory) = config.directory {
        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(directory, LOG_FILE_PREFIX));
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .boxed(),
        );
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(guard)
}
