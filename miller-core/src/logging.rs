//! src/logging.rs
//! ============================================================================
//! # Structured JSON logging
//!
//! Installs a global `tracing` subscriber that writes one JSON object per
//! event into a rolling file through a non-blocking writer. Call sites use
//! the `marker` / `operation_type` field convention so log lines can be
//! grouped without parsing messages:
//!
//! ```rust,ignore
//! info!(marker = "COLUMN_LOADED", operation_type = "directory_listing", entries = 12, "listing applied");
//! ```
//!
//! Keep the returned [`WorkerGuard`] alive until shutdown; dropping it
//! flushes pending lines and stops the writer thread.

use std::{
    path::{Component, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, fmt::time::ChronoUtc, layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    /// `EnvFilter` directive, e.g. `info` or `miller_core=debug`
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,
    /// Mirror events to stderr in human-readable form
    pub stderr: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogRotation {
    Never,
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(value: LogRotation) -> Self {
        match value {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("miller"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
            stderr: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,

    #[error("log directory {path:?} rejected: {reason}")]
    BadDirectory { path: PathBuf, reason: &'static str },

    #[error("invalid logging setting `{field}`: {reason}")]
    BadSetting {
        field: &'static str,
        reason: CompactString,
    },
}

impl LoggerConfig {
    /// Rejects settings the appender or filter would choke on later.
    pub fn validate(&self) -> Result<(), LoggingError> {
        let dir_error = |reason| LoggingError::BadDirectory {
            path: self.log_dir.clone(),
            reason,
        };

        if self.log_dir.as_os_str().is_empty() {
            return Err(dir_error("empty path"));
        }
        if self.log_dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(dir_error("`..` components are not allowed"));
        }
        if self.max_log_files == 0 {
            return Err(LoggingError::BadSetting {
                field: "max_log_files",
                reason: CompactString::const_new("must be at least 1"),
            });
        }
        if self.log_file_prefix.trim().is_empty() {
            return Err(LoggingError::BadSetting {
                field: "log_file_prefix",
                reason: CompactString::const_new("must not be blank"),
            });
        }
        self.directive()?;
        Ok(())
    }

    fn directive(&self) -> Result<Directive, LoggingError> {
        Directive::from_str(&self.log_level).map_err(|e| LoggingError::BadSetting {
            field: "log_level",
            reason: CompactString::from(e.to_string()),
        })
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        Ok(EnvFilter::from_default_env().add_directive(self.directive()?))
    }
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Default)]
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.log_level = CompactString::new(level);
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_stderr(mut self, enabled: bool) -> Self {
        self.config.stderr = enabled;
        self
    }

    /// Installs the subscriber. Only the first successful call in a process
    /// wins; later calls fail with [`LoggingError::AlreadyInitialized`].
    pub async fn install(self) -> Result<WorkerGuard> {
        let config = self.config;
        config.validate()?;

        if INSTALLED.load(Ordering::Acquire) {
            return Err(LoggingError::AlreadyInitialized.into());
        }

        tokio::fs::create_dir_all(&config.log_dir)
            .await
            .with_context(|| format!("creating log directory {}", config.log_dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(config.rotation.into())
            .filename_prefix(config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(config.max_log_files)
            .build(&config.log_dir)
            .context("building rolling file appender")?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .with_filter(config.filter()?);

        let stderr_layer = if config.stderr {
            Some(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(config.filter()?),
            )
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;
        INSTALLED.store(true, Ordering::Release);

        tracing::info!(
            marker = "LOGGING_READY",
            operation_type = "logging",
            log_dir = %config.log_dir.display(),
            level = %config.log_level,
            stderr = config.stderr,
            "logging initialized"
        );

        Ok(guard)
    }
}

/// Shorthand for `LoggerBuilder::new().with_config(config).install()`.
pub async fn init_logging(config: LoggerConfig) -> Result<WorkerGuard> {
    LoggerBuilder::new().with_config(config).install().await
}
