//! Process-wide logging bootstrap for the annotation engine.
//!
//! # Responsibility
//! - Start the rotating file logger behind the `log` facade once per process.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Initialization is idempotent for an identical level and directory.
//! - A second initialization with another level or directory is rejected.
//! - Initialization never panics.
//! - Engine events carry structure only (kinds, handles, counts), never
//!   names, content or metadata values.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "corflow";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Errors from `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyDirectory,
    RelativeDirectory(PathBuf),
    CreateDirectory { dir: PathBuf, message: String },
    Backend(String),
    /// Logger already runs with another level or directory.
    AlreadyInitialized { level: &'static str, dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDirectory => write!(f, "log directory cannot be empty"),
            Self::RelativeDirectory(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDirectory { dir, message } => write!(
                f,
                "failed to create log directory `{}`: {message}",
                dir.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::AlreadyInitialized { level, dir } => write!(
                f,
                "logging already initialized with level `{level}` at `{}`",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {}

/// Starts file logging at `level` under `log_dir`.
///
/// Files are named `corflow*.log`, rotated by size and pruned to the newest
/// few. The first successful call also installs the panic hook.
///
/// # Errors
/// - `UnsupportedLevel` for anything but trace/debug/info/warn(ing)/error.
/// - `EmptyDirectory` / `RelativeDirectory` for unusable paths.
/// - `AlreadyInitialized` when a different configuration is active.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let level = normalize_level(level)?;
    let dir = normalize_log_dir(log_dir.as_ref())?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(level, &dir))?;
    if active.level != level || active.dir != dir {
        return Err(LoggingError::AlreadyInitialized {
            level: active.level,
            dir: active.dir.clone(),
        });
    }
    Ok(())
}

/// Active `(level, directory)`, or `None` before `init_logging` succeeds.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.dir.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|err| LoggingError::CreateDirectory {
        dir: dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_started module=logging level={} version={}",
        level,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    if log_dir.as_os_str().is_empty() {
        return Err(LoggingError::EmptyDirectory);
    }
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(log_dir.to_path_buf()));
    }
    Ok(log_dir.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = info.payload().downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        error!(
            "event=panic_captured module=logging location={} payload={}",
            location,
            sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(info);
    }));
}

/// Single-line, length-capped copy of `value`.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let single_line = value.replace(['\n', '\r'], " ");
    let mut capped: String = single_line.chars().take(max_chars).collect();
    if single_line.chars().count() > max_chars {
        capped.push_str("...");
    }
    capped
}
