//! Tracing setup for the binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Env var holding the tracing filter directive.
pub const LOG_ENV: &str = "PREFSHARE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber.
///
/// Logs go to stderr, or to `log_file` when configured. The returned guard
/// flushes the file writer on drop and must outlive the program's work.
/// If a global subscriber is already installed it is kept, and that is
/// logged at debug level through it.
///
/// # Errors
/// Returns an error if the log file's directory cannot be created.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let Some(log_file) = config.log_file.as_deref().filter(|p| !p.trim().is_empty()) else {
        install_stderr();
        return Ok(None);
    };

    let path = Path::new(log_file);
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {log_file}"))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .try_init();
    if installed(result) {
        Ok(Some(guard))
    } else {
        // The file writer was never attached; nothing to flush.
        Ok(None)
    }
}

fn install_stderr() -> bool {
    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    installed(result)
}

fn installed(result: Result<(), Box<dyn std::error::Error + Send + Sync>>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "tracing subscriber already installed; keeping it");
            false
        }
    }
}
