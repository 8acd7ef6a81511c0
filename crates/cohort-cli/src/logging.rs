//! Logging initialization and configuration.
//!
//! The operator's terminal is the main output of cohort, so logs stay out of
//! its way:
//! - **Terminal**: compact logs to stderr, `warn` and above by default
//! - **Directory**: JSON logs to daily rolling files, `info` and above by default
//!
//! `RUST_LOG` takes precedence, then `COHORT_LOG_LEVEL`, then the default.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the fallback filter directive.
pub const LOG_LEVEL_ENV: &str = "COHORT_LOG_LEVEL";

/// Static guard to keep the non-blocking file writer alive.
/// It must persist for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Compact lines on stderr.
    Stderr,
    /// JSON lines in `cohort.YYYY-MM-DD` files inside this directory.
    Directory(PathBuf),
}

impl LogTarget {
    /// Pick a target from an optional log directory.
    #[must_use]
    pub fn from_dir(dir: Option<&Path>) -> Self {
        dir.map_or(Self::Stderr, |dir| Self::Directory(dir.to_path_buf()))
    }

    /// Filter used when neither environment variable is set.
    #[must_use]
    pub const fn default_level(&self) -> &'static str {
        match self {
            Self::Stderr => "warn",
            Self::Directory(_) => "info",
        }
    }
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(target: &LogTarget) -> anyhow::Result<()> {
    let log_level =
        std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| target.default_level().to_string());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    match target {
        LogTarget::Stderr => init_stderr(env_filter),
        LogTarget::Directory(dir) => init_directory(env_filter, dir)?,
    }

    Ok(())
}

/// Compact, uncoloured lines on stderr, leaving stdout to the operator.
fn init_stderr(env_filter: EnvFilter) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Structured JSON to rolling files.
fn init_directory(env_filter: EnvFilter, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;

    // Rolling file appender - creates new file daily
    let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "cohort");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    let _ = FILE_GUARD.set(file_guard);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_dir() {
        assert_eq!(LogTarget::from_dir(None), LogTarget::Stderr);
        assert_eq!(
            LogTarget::from_dir(Some(Path::new("/var/log/cohort"))),
            LogTarget::Directory(PathBuf::from("/var/log/cohort"))
        );
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(LogTarget::Stderr.default_level(), "warn");
        assert_eq!(
            LogTarget::Directory(PathBuf::from("logs")).default_level(),
            "info"
        );
        assert!(EnvFilter::try_new(LogTarget::Stderr.default_level()).is_ok());
    }
}
