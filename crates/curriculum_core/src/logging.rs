//! File logging for the curriculum core.
//!
//! # Responsibility
//! - Start the rolling file logger described by `CoreConfig`, once per process.
//! - Route panics into the log as one sanitized line.
//!
//! # Invariants
//! - Starting again with the same level and directory is a no-op.
//! - Starting with a different level or directory is rejected.
//! - Log lines carry document refs, field paths and counts; never field values.

use crate::config::CoreConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Once;

const LOG_FILE_BASENAME: &str = "curriculum";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Level and directory a file logger runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub level: &'static str,
    pub dir: PathBuf,
}

impl LogTarget {
    /// Derives the target from `config`; `None` when no log directory is set.
    pub fn from_config(config: &CoreConfig) -> LogResult<Option<Self>> {
        let Some(dir) = &config.log_dir else {
            return Ok(None);
        };
        let level = normalize_level(&config.log_level).map_err(LogError::Config)?;
        if !dir.is_absolute() {
            return Err(LogError::Config(format!(
                "log_dir must be an absolute path, got `{}`",
                dir.display()
            )));
        }
        Ok(Some(Self {
            level,
            dir: dir.clone(),
        }))
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.level, self.dir.display())
    }
}

pub type LogResult<T> = Result<T, LogError>;

#[derive(Debug)]
pub enum LogError {
    /// Level or directory in the config is unusable.
    Config(String),
    /// A logger is already running with another target.
    Conflict {
        active: LogTarget,
        requested: LogTarget,
    },
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
}

impl Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(reason) => write!(f, "invalid logging config: {reason}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already running as `{active}`; refusing to switch to `{requested}`"
            ),
            Self::CreateDir { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
        }
    }
}

impl Error for LogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::Config(_) | Self::Conflict { .. } => None,
        }
    }
}

impl From<FlexiLoggerError> for LogError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Starts file logging as configured.
///
/// Returns `Ok(false)` when `config` has no log directory, `Ok(true)` once the
/// logger runs with exactly the configured target.
///
/// # Errors
/// - `LogError::Config` for an unknown level or a relative directory.
/// - `LogError::Conflict` when a logger with another target is running.
/// - `LogError::CreateDir` / `LogError::Backend` when the backend cannot start.
pub fn init_logging(config: &CoreConfig) -> LogResult<bool> {
    let Some(target) = LogTarget::from_config(config)? else {
        return Ok(false);
    };
    let active = ACTIVE.get_or_try_init(|| start(target.clone()))?;
    if active.target != target {
        return Err(LogError::Conflict {
            active: active.target.clone(),
            requested: target,
        });
    }
    Ok(true)
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn start(target: LogTarget) -> LogResult<ActiveLogger> {
    std::fs::create_dir_all(&target.dir).map_err(|source| LogError::CreateDir {
        dir: target.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(target.level)?
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_start module=core status=ok level={} log_dir={} version={}",
        target.level,
        target.dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={} payload={}",
            location,
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

/// Flattens `text` to one line of at most `max_chars` characters.
fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
