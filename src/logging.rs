//! Logging setup for the `stagewise` binary and embedding applications.
//!
//! The engine itself only emits `tracing` events. [`init`] installs a
//! subscriber that pretty-prints them on stderr and writes them to
//! daily-rotating files in the platform data directory:
//!
//! - `stagewise.log`: every enabled level
//! - `error.log`: warnings and errors only
//!
//! The console and `stagewise.log` default to `info`; set `RUST_LOG` to
//! override (e.g. `RUST_LOG=stagewise=debug` to see every stage run).
//!
//! ```no_run
//! stagewise::logging::init()?;
//! tracing::info!("ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "stagewise";
const ALL_LOGS_PREFIX: &str = "stagewise";
const ERROR_LOGS_PREFIX: &str = "error";
const RETAINED_FILES: usize = 10;

/// Log directory under the platform data dir, created on first use.
///
/// - Windows: `%APPDATA%/stagewise/logs`
/// - macOS: `~/Library/Application Support/stagewise/logs`
/// - Linux: `~/.local/share/stagewise/logs`
///
/// # Errors
///
/// Fails when there is no data directory or it cannot be created.
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    let log_dir = base_dir.join(APP_DIR).join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn daily_appender(log_dir: &std::path::Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(RETAINED_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} log appender"))
}

/// Install the global subscriber. Call once, at startup.
///
/// # Errors
///
/// Returns an error if the log directory or an appender cannot be created.
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;
    let all_logs_appender = daily_appender(&log_dir, ALL_LOGS_PREFIX)?;
    let error_logs_appender = daily_appender(&log_dir, ERROR_LOGS_PREFIX)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    // stdout carries command output, so the console layer goes to stderr
    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .pretty();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .init();

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());
    Ok(())
}

/// Today's `stagewise.log` file.
///
/// # Errors
///
/// Fails like [`get_log_dir`].
pub fn current_log_path() -> Result<PathBuf> {
    dated_log_path(ALL_LOGS_PREFIX)
}

/// Today's `error.log` file.
///
/// # Errors
///
/// Fails like [`get_log_dir`].
pub fn current_error_log_path() -> Result<PathBuf> {
    dated_log_path(ERROR_LOGS_PREFIX)
}

fn dated_log_path(prefix: &str) -> Result<PathBuf> {
    let log_dir = get_log_dir()?;
    Ok(log_dir.join(dated_file_name(prefix, chrono::Local::now().date_naive())))
}

fn dated_file_name(prefix: &str, day: chrono::NaiveDate) -> String {
    format!("{prefix}.{}.log", day.format("%Y-%m-%d"))
}
