//! Tracing setup and the per-session log files.
//!
//! Every run recreates two files in the log directory: the app log records
//! each step of the session, the error log only its errors.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub const APP_LOG_FILE: &str = "app_log.txt";
pub const ERROR_LOG_FILE: &str = "error_log.txt";

const APP_LOG_HEADER: &str = "App log file";
const ERROR_LOG_HEADER: &str = "App error file";

const DEFAULT_FILTER: &str = "kri_worker=debug,kri_pipeline=debug,kri_events=info";

/// Directory the session log files are written to (`LOG_DIR`, default `.`).
pub fn log_dir_from_env() -> PathBuf {
    std::env::var("LOG_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The two session log files, truncated and headed.
pub struct SessionLogFiles {
    pub app_log: File,
    pub error_log: File,
}

impl SessionLogFiles {
    /// Create (or reinitialise) both log files in `dir`.
    pub fn create(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            app_log: create_with_header(&dir.join(APP_LOG_FILE), APP_LOG_HEADER)?,
            error_log: create_with_header(&dir.join(ERROR_LOG_FILE), ERROR_LOG_HEADER)?,
        })
    }
}

/// Background writer threads of the session log files.
///
/// Hold it for the whole session; dropping it flushes both files.
#[must_use = "dropping the guards stops writing the session log files"]
pub struct LogGuards {
    _app_log: WorkerGuard,
    _error_log: WorkerGuard,
}

impl SessionLogFiles {
    /// Hand both files to background writer threads.
    pub fn into_non_blocking(self) -> (NonBlocking, NonBlocking, LogGuards) {
        let (app_log, app_guard) = tracing_appender::non_blocking(self.app_log);
        let (error_log, error_guard) = tracing_appender::non_blocking(self.error_log);
        (
            app_log,
            error_log,
            LogGuards {
                _app_log: app_guard,
                _error_log: error_guard,
            },
        )
    }
}

fn create_with_header(path: &Path, header: &str) -> io::Result<File> {
    let mut file = File::create(path)?;
    writeln!(file, "{header}")?;
    Ok(file)
}

/// Install the global subscriber: console output filtered by `RUST_LOG`,
/// INFO and above to the app log, ERROR to the error log.
pub fn init_tracing(dir: &Path) -> io::Result<LogGuards> {
    let (app_log, error_log, guards) = SessionLogFiles::create(dir)?.into_non_blocking();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| DEFAULT_FILTER.into()),
            ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(app_log)
                .with_filter(LevelFilter::INFO),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(error_log)
                .with_filter(LevelFilter::ERROR),
        )
        .init();

    Ok(guards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_both_files_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        SessionLogFiles::create(dir.path()).unwrap();

        let app = std::fs::read_to_string(dir.path().join(APP_LOG_FILE)).unwrap();
        let error = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
        assert_eq!(app, "App log file\n");
        assert_eq!(error, "App error file\n");
    }

    #[test]
    fn reinitialises_files_from_a_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(APP_LOG_FILE), "old session output\n").unwrap();

        SessionLogFiles::create(dir.path()).unwrap();

        let app = std::fs::read_to_string(dir.path().join(APP_LOG_FILE)).unwrap();
        assert_eq!(app, "App log file\n");
    }

    #[test]
    fn background_writers_append_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut error, guards) = SessionLogFiles::create(dir.path())
            .unwrap()
            .into_non_blocking();

        app.write_all(b"Producer stage started\n").unwrap();
        error.write_all(b"Pipeline stage failed\n").unwrap();
        drop(guards);

        let app = std::fs::read_to_string(dir.path().join(APP_LOG_FILE)).unwrap();
        let error = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
        assert_eq!(app, "App log file\nProducer stage started\n");
        assert_eq!(error, "App error file\nPipeline stage failed\n");
    }

    #[test]
    fn creates_missing_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("kri");

        SessionLogFiles::create(&nested).unwrap();

        assert!(nested.join(ERROR_LOG_FILE).exists());
    }
}
