use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::BazaarConfig;

const LOG_FILE_PREFIX: &str = "bazaar";

/// Install the global tracing subscriber: daily-rotated files under
/// `~/.bazaar/logs`, filter taken from `RUST_LOG` with a crate-scoped
/// default. The returned guard flushes the writer on drop, so the caller
/// keeps it alive for the life of the process.
pub fn init_logging() -> Result<WorkerGuard> {
    install(
        &BazaarConfig::logs_dir()?,
        "info,bazaar_app=debug,bazaar_chain=debug,bazaar_pinning=debug",
    )
}

/// Same, into an explicit directory with an explicit fallback filter, for
/// tests and tools that must not touch `~/.bazaar`.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter)
}

fn install(logs_dir: &Path, default_filter: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}
