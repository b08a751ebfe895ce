use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,scrooge_app=debug,scrooge_chain=debug,scrooge_core=debug";

/// Initializes console logging on stderr.
///
/// stdout is reserved for the deployer's result lines, so every log record
/// goes to stderr.
pub fn init_logging() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}

/// Initializes stderr logging plus a daily-rotated file under `logs_dir`.
/// Returns a guard that must be kept alive until the process exits.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "scrooge-deploy");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// Initializes logging for the deployer binary.
///
/// With `logs_dir`, records also go to a daily file. When that directory
/// cannot be used the error is printed and stderr logging is installed
/// instead, so later `error!` records still reach the console.
pub fn init_logging_with_fallback(logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    if let Some(dir) = logs_dir {
        match init_logging_to_dir(dir, DEFAULT_FILTER) {
            Ok(guard) => return Ok(Some(guard)),
            Err(e) => eprintln!(
                "File logging under {} unavailable, logging to stderr only: {e:#}",
                dir.display()
            ),
        }
    }
    init_logging()?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let logs_dir = tmp.path().join("nested").join("logs");
        assert!(!logs_dir.exists());

        // Only one global subscriber per process; the directory is created
        // either way.
        let result = init_logging_to_dir(&logs_dir, "warn");
        assert!(logs_dir.exists());

        if let Err(e) = result {
            assert!(e.to_string().contains("logging"), "unexpected error: {e}");
        }
    }

    #[test]
    fn test_second_init_reports_error_instead_of_panicking() {
        let _ = init_logging();
        let second = init_logging();
        assert!(second.is_err());
    }

    #[test]
    fn test_unusable_log_dir_falls_back_to_stderr() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let logs_dir = blocker.join("logs");

        // The file layer cannot be built under a regular file. The fallback
        // either installs stderr logging or finds a subscriber already set.
        match init_logging_with_fallback(Some(&logs_dir)) {
            Ok(guard) => assert!(guard.is_none()),
            Err(e) => assert!(
                e.to_string().contains("Failed to initialize logging"),
                "fallback not attempted: {e}"
            ),
        }
        assert!(!logs_dir.exists());
    }

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER);
        assert!(filter.is_ok());
    }
}
