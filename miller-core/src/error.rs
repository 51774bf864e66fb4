//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the Browser Core
//!
//! Every fallible operation in the crate returns `Result<T, AppError>`.
//! Variants carry enough context to show the user what failed and where:
//!
//! - listing failures end up as an error flag on the affected column
//! - operation failures are returned to the caller verbatim
//! - invalid targets are logged and ignored by the caller
//!
//! Stale listing completions never become errors; they are dropped.

use clipr::ClipError;
use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{Level, event};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A directory could not be listed.
    #[error("Cannot list {path:?}: {reason}")]
    ListingFailed { path: PathBuf, reason: CompactString },

    /// A copy/move/delete/trash/rename job failed.
    #[error("{operation} failed for {} path(s): {reason}", paths.len())]
    OperationFailed {
        operation: CompactString,
        paths: Vec<PathBuf>,
        reason: CompactString,
    },

    /// Out-of-range column/entry or an action with nothing selected.
    #[error("Invalid target: {0}")]
    InvalidTarget(CompactString),

    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config file I/O error with path.
    #[error("Failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipError),

    /// Thumbnail cache error.
    #[error("Cache operation failed: {operation} on key '{key}': {reason}")]
    Cache {
        operation: CompactString,
        key: CompactString,
        reason: CompactString,
    },

    #[error("Could not open {path:?}: {reason}")]
    Launch { path: PathBuf, reason: CompactString },

    #[error("Thumbnail rendering failed for {path:?}: {reason}")]
    Render { path: PathBuf, reason: CompactString },

    /// Operation cancelled by user or system.
    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Other(CompactString),
}

impl AppError {
    pub fn listing_failed<P: Into<PathBuf>>(path: P, reason: impl Into<CompactString>) -> Self {
        Self::ListingFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn operation_failed<I, P>(operation: &str, paths: I, reason: impl Into<CompactString>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::OperationFailed {
            operation: CompactString::new(operation),
            paths: paths.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    pub fn invalid_target(message: impl Into<CompactString>) -> Self {
        Self::InvalidTarget(message.into())
    }

    pub fn cache_operation_failed(operation: &str, key: &str, reason: impl Into<CompactString>) -> Self {
        Self::Cache {
            operation: CompactString::new(operation),
            key: CompactString::new(key),
            reason: reason.into(),
        }
    }

    /// Maps an io error at `path` onto the path-aware variants.
    pub fn from_io_at(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(error),
        }
    }

    /// Lifts executor failures into [`AppError::OperationFailed`]; other
    /// clipboard errors stay wrapped.
    pub fn from_clip(error: ClipError) -> Self {
        match error {
            ClipError::OperationFailed {
                operation,
                paths,
                reason,
            } => Self::OperationFailed {
                operation,
                paths,
                reason,
            },
            other => Self::Clipboard(other),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_)
                | Self::NotFound(_)
                | Self::ListingFailed { .. }
                | Self::Cancelled
        )
    }

    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::PermissionDenied(_) | Self::NotFound(_) => "file_system",
            Self::ListingFailed { .. } => "directory_listing",
            Self::OperationFailed { .. } => "file_operation",
            Self::InvalidTarget(_) => "invalid_target",
            Self::Config(_) | Self::ConfigIo { .. } => "configuration",
            Self::Clipboard(_) => "clipboard",
            Self::Cache { .. } => "thumbnail_cache",
            Self::Launch { .. } => "launcher",
            Self::Render { .. } => "thumbnail_render",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "unknown_error",
        }
    }

    /// Paths the failure is about, for the UI to highlight.
    pub fn paths(&self) -> SmallVec<[&Path; 2]> {
        match self {
            Self::ListingFailed { path, .. }
            | Self::PermissionDenied(path)
            | Self::NotFound(path)
            | Self::ConfigIo { path, .. }
            | Self::Launch { path, .. }
            | Self::Render { path, .. } => smallvec![path.as_path()],
            Self::OperationFailed { paths, .. } => paths.iter().map(PathBuf::as_path).collect(),
            Self::Clipboard(e) => e.failed_paths().iter().map(PathBuf::as_path).collect(),
            _ => SmallVec::new(),
        }
    }

    /// Emits one structured error event and hands the error back.
    #[must_use]
    pub fn trace(self) -> Self {
        event!(
            Level::ERROR,
            marker = "APP_ERROR",
            operation_type = self.operation_type(),
            error = %self,
            recoverable = self.is_recoverable(),
            paths = ?self.paths(),
        );
        self
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(CompactString::from(format!("{e:#}")))
    }
}

// Manual Clone implementation to handle non-Clone fields
impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::ListingFailed { path, reason } => Self::ListingFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::OperationFailed {
                operation,
                paths,
                reason,
            } => Self::OperationFailed {
                operation: operation.clone(),
                paths: paths.clone(),
                reason: reason.clone(),
            },
            Self::InvalidTarget(msg) => Self::InvalidTarget(msg.clone()),
            Self::PermissionDenied(path) => Self::PermissionDenied(path.clone()),
            Self::NotFound(path) => Self::NotFound(path.clone()),
            Self::Config(e) => Self::Other(CompactString::from(format!("Config error: {e}"))),
            Self::ConfigIo { path, source } => Self::ConfigIo {
                path: path.clone(),
                source: io::Error::new(source.kind(), source.to_string()),
            },
            Self::Clipboard(e) => Self::Clipboard(e.clone()),
            Self::Cache {
                operation,
                key,
                reason,
            } => Self::Cache {
                operation: operation.clone(),
                key: key.clone(),
                reason: reason.clone(),
            },
            Self::Launch { path, reason } => Self::Launch {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::Render { path, reason } => Self::Render {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::Cancelled => Self::Cancelled,
            Self::Other(msg) => Self::Other(msg.clone()),
        }
    }
}
