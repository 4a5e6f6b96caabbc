use anyhow::{Context, Result};
use runwatch_runtime::Config;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::types::LogLevel;

/// Install the global subscriber, writing to a file under the data directory.
///
/// The terminal belongs to the TUI, so nothing is ever logged to it.
/// `RUNWATCH_LOG` takes precedence over `--log-level`.
pub fn init(data_dir: &Path, config: &Config, level: LogLevel) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let log_path = data_dir.join(&config.log_file);
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_env("RUNWATCH_LOG").unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(log_path)
}
