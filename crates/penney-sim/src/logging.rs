use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Keeps the non-blocking telemetry writer alive for the length of the run.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Where a run's structured telemetry lands: `telemetry.jsonl` beside the
/// markdown summary.
pub fn telemetry_path(outputs: &ResolvedOutputs) -> PathBuf {
    match outputs.summary_md.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join("telemetry.jsonl"),
        _ => PathBuf::from("telemetry.jsonl"),
    }
}

/// Install a JSON tracing subscriber writing to the telemetry file, or do
/// nothing when structured logging is disabled.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let path = telemetry_path(outputs);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory {}", dir.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("creating telemetry log {}", path.display()))?;

    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // A global subscriber may already be installed when tests share the
    // process; the first one wins.
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_writer(writer)
        .try_init();

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path: path,
    }))
}
