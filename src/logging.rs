//! Logging setup
//!
//! One tracing registry with two sinks: a run-scoped log file under
//! `extra/logs/` (plain text, debug detail, daily rotation) and the console.
//! Operational events reach both, which replaces stream-swapping tricks for
//! "everything on screen is also in the log".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_DIR: &str = "extra/logs";
const LOG_FILE: &str = "mediashrink.log";

pub fn log_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(LOG_DIR)
}

/// Initialize the global subscriber. `verbose` raises the default level to
/// debug (command lines, retry attempts); `RUST_LOG` still wins when set.
pub fn init(base_dir: &Path, verbose: bool) -> Result<()> {
    let dir = log_dir(base_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE);

    let default_level = if verbose {
        "mediashrink=debug"
    } else {
        "mediashrink=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("logging already initialized")?;

    tracing::debug!(log_dir = %dir.display(), "logging initialized");
    Ok(())
}
