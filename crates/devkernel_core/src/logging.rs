//! Kernel logging bootstrap.
//!
//! # Responsibility
//! - Start size-rotated file logging once per process.
//! - Capture panics (including isolated listener panics) as sanitized log lines.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and directory is a no-op.
//! - Switching level or directory after start is rejected.
//! - Initialization never panics.

use crate::error::{KernelError, KernelResult};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "devkernel";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_LOGGED_TEXT_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn ensure_same(&self, level: &'static str, log_dir: &Path) -> KernelResult<()> {
        if self.log_dir != log_dir {
            return Err(KernelError::conflict(format!(
                "logging already writes to `{}`; refusing `{}`",
                self.log_dir.display(),
                log_dir.display()
            )));
        }
        if self.level != level {
            return Err(KernelError::conflict(format!(
                "logging already runs at `{}`; refusing `{level}`",
                self.level
            )));
        }
        Ok(())
    }
}

/// Starts file logging under `log_dir` (absolute path) at `level`.
pub fn init_logging(level: &str, log_dir: &str) -> KernelResult<()> {
    let level = parse_level(level)?;
    let log_dir = parse_log_dir(log_dir)?;

    if let Some(active) = ACTIVE.get() {
        return active.ensure_same(level, &log_dir);
    }

    let active = ACTIVE.get_or_try_init(|| start(level, &log_dir))?;
    active.ensure_same(level, &log_dir)
}

fn start(level: &'static str, log_dir: &Path) -> KernelResult<ActiveLogger> {
    std::fs::create_dir_all(log_dir).map_err(|err| {
        KernelError::validation(format!(
            "cannot create log directory `{}`: {err}",
            log_dir.display()
        ))
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| KernelError::validation(format!("invalid log level `{level}`: {err}")))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        // [timestamp] LEVEL [module] file:line: message
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| KernelError::validation(format!("cannot start logger: {err}")))?;

    install_panic_hook();
    info!(
        "event=logging_start module=kernel status=ok platform={} build_mode={} version={} level={}",
        std::env::consts::OS,
        if cfg!(debug_assertions) { "debug" } else { "release" },
        env!("CARGO_PKG_VERSION"),
        level
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

/// `(level, log_dir)` of the running logger, if started.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(level: &str) -> KernelResult<&'static str> {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        other => {
            return Err(KernelError::validation(format!(
                "unsupported log level `{other}`; expected trace|debug|info|warn|error"
            )))
        }
    };
    Ok(level)
}

fn parse_log_dir(log_dir: &str) -> KernelResult<PathBuf> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err(KernelError::validation("log_dir must not be empty"));
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(KernelError::validation(format!(
            "log_dir must be absolute, got `{trimmed}`"
        )));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=kernel status=error location={} payload={}",
            location,
            sanitize(&payload)
        );
        previous(panic_info);
    }));
}

/// Single-line, length-capped form of free text before it reaches logs or diagnostics.
pub(crate) fn sanitize(value: &str) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut capped: String = flattened.chars().take(MAX_LOGGED_TEXT_CHARS).collect();
    if flattened.chars().count() > MAX_LOGGED_TEXT_CHARS {
        capped.push_str("...");
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, parse_log_dir, sanitize};
    use crate::error::KernelError;

    #[test]
    fn parse_level_accepts_known_values() {
        assert_eq!(parse_level("INFO").expect("INFO should parse"), "info");
        assert_eq!(parse_level(" warning ").expect("warning should parse"), "warn");
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn parse_log_dir_rejects_relative_path() {
        let err = parse_log_dir("logs/dev").expect_err("relative paths must be rejected");
        assert!(matches!(err, KernelError::Validation(_)));
    }

    #[test]
    fn sanitize_flattens_and_caps() {
        let cleaned = sanitize(&format!("a\nb\r{}", "x".repeat(400)));
        assert!(!cleaned.contains('\n') && !cleaned.contains('\r'));
        assert!(cleaned.ends_with("..."));
        assert_eq!(sanitize("short"), "short");
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_switches() {
        // Kept on disk: the process-wide logger outlives this test.
        let first = tempfile::tempdir().expect("temp dir").into_path();
        let second = tempfile::tempdir().expect("temp dir").into_path();
        let first_path = first.to_str().expect("utf-8 temp dir");
        let second_path = second.to_str().expect("utf-8 temp dir");

        init_logging("info", first_path).expect("first init should succeed");
        init_logging("info", first_path).expect("same config should be a no-op");

        let err = init_logging("debug", first_path).expect_err("level switch must fail");
        assert!(matches!(err, KernelError::Conflict(_)));
        let err = init_logging("info", second_path).expect_err("dir switch must fail");
        assert!(matches!(err, KernelError::Conflict(_)));

        let (level, dir) = logging_status().expect("logging should be active");
        assert_eq!(level, "info");
        assert_eq!(dir, first);
    }
}
