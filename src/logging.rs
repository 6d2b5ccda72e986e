//! Logging setup driven by `Settings`.
//!
//! Outputs:
//! - stderr, always
//! - `<logs_dir>/dashboard_info.<date>.log` (INFO and WARN) when `LOG_TO_FILE`
//!   is on and the command may write to disk
//! - `<logs_dir>/dashboard_errors.<date>.log` (ERROR only) when
//!   `LOG_SEPARATE_ERRORS` is also on
//!
//! Files roll over daily and old ones are pruned. `RUST_LOG` overrides the
//! configured level.

use crate::config::{LogLevel, Settings};
use crate::paths::{LOG_FILE_SUFFIX, LogFile, LogicalPath, PathResolver, ResolvedPath};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Layer, fmt};

/// Convert the configured level to a tracing level.
pub fn log_level_to_tracing(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Configured level, lowered to debug when `verbose`.
pub fn effective_level(level: LogLevel, verbose: bool) -> LogLevel {
    if verbose { level.min(LogLevel::Debug) } else { level }
}

/// Stderr-only logging for the startup pipeline, before `Settings` exist.
///
/// Active until the returned guard is dropped.
pub fn bootstrap(verbose: bool) -> DefaultGuard {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Whether the info file keeps a record at `level`.
///
/// DEBUG and TRACE never reach it. ERROR goes to the error file instead when
/// errors are kept separately.
pub fn info_file_accepts(level: &Level, separate_errors: bool) -> bool {
    *level <= Level::INFO && !(separate_errors && *level == Level::ERROR)
}

fn rolling_file(dir: &Path, file: LogFile) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file.file_prefix())
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(file.retention_days())
        .build(dir)
        .with_context(|| format!("Failed to open {} log in {}", file.file_prefix(), dir.display()))
}

/// Install the process-wide subscriber described by `settings`.
///
/// File outputs are only set up when `files` is given; commands that must
/// not write to disk pass `None`. Returns the logs directory when file
/// logging was installed.
pub fn init(
    settings: &Settings,
    files: Option<&PathResolver>,
    verbose: bool,
) -> Result<Option<ResolvedPath>> {
    let level = log_level_to_tracing(effective_level(settings.log_level(), verbose));
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let logs_dir = match files {
        Some(paths) if settings.log_to_file() => Some(
            paths
                .resolve(LogicalPath::LogsDir)
                .context("Failed to prepare the logs directory")?,
        ),
        _ => None,
    };
    let separate_errors = settings.log_separate_errors();

    let info_layer = match logs_dir {
        Some(ref logs) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(rolling_file(&logs.path, LogFile::Info)?)
                .with_filter(filter_fn(move |meta| {
                    info_file_accepts(meta.level(), separate_errors)
                })),
        ),
        None => None,
    };

    let error_layer = match logs_dir {
        Some(ref logs) if separate_errors => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(rolling_file(&logs.path, LogFile::Errors)?)
                .with_filter(LevelFilter::ERROR),
        ),
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(info_layer)
        .with(error_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(logs_dir)
}
