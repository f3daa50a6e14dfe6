use std::path::PathBuf;
use std::sync::Once;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Error;

static LOGGER: Once = Once::new();

pub const LOG_ENV_VAR: &str = "FANOUT_LOG";

pub struct Logger {
    logs_dir_path: PathBuf,
    filter: String,
}

impl Logger {
    pub fn new(logs_dir_path: PathBuf, filter: String) -> Self {
        Self {
            logs_dir_path,
            filter,
        }
    }

    /// Installs the file logger for the process. Only the first call does
    /// anything.
    pub fn start(&self) -> Result<(), Error> {
        let mut result = Ok(());
        LOGGER.call_once(|| result = self.install());
        result
    }

    fn install(&self) -> Result<(), Error> {
        let dir = &self.logs_dir_path;
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("cannot create log directory {}: {}", dir.display(), e)))?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("fanout.log")
            .build(dir)
            .map_err(|e| Error::config(format!("cannot open log file in {}: {}", dir.display(), e)))?;
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = fmt::Subscriber::builder()
            .with_writer(file_writer)
            .with_env_filter(self.env_filter())
            .with_ansi(false)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set the global tracing default: {}", e);
            return Ok(());
        }

        // The writer must outlive every log call, keep it for the process.
        std::mem::forget(guard);
        Ok(())
    }

    fn env_filter(&self) -> EnvFilter {
        match std::env::var(LOG_ENV_VAR) {
            Ok(val) => EnvFilter::new(val),
            Err(_) => EnvFilter::new(self.filter.as_str()),
        }
    }
}

pub fn create_span() -> tracing::Span {
    tracing::info_span!("fanout", run = %std::process::id())
}
