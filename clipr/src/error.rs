//! Clipboard error handling with compact, clonable payloads

use compact_str::CompactString;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ClipResult<T> = Result<T, ClipError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("Nothing is selected")]
    EmptySelection,

    #[error("Invalid file path: {0}")]
    InvalidPath(CompactString),

    #[error("Invalid {format} payload: {reason}")]
    InvalidPayload {
        format: CompactString,
        reason: CompactString,
    },

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(CompactString),

    /// Executor failure, surfaced verbatim to the caller.
    #[error("{operation} failed for {} path(s): {reason}", paths.len())]
    OperationFailed {
        operation: CompactString,
        paths: Vec<PathBuf>,
        reason: CompactString,
    },

    #[error("Clipboard backend error: {0}")]
    Backend(CompactString),
}

impl ClipError {
    /// Fast inline recovery check for hot paths
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyClipboard
                | Self::EmptySelection
                | Self::InvalidPayload { .. }
                | Self::UnsupportedScheme(_)
        )
    }

    #[inline]
    #[must_use]
    pub fn invalid_path(path: &Path) -> Self {
        Self::InvalidPath(CompactString::from(path.to_string_lossy()))
    }

    #[inline]
    #[must_use]
    pub fn invalid_payload(format: &str, reason: impl Into<CompactString>) -> Self {
        Self::InvalidPayload {
            format: CompactString::new(format),
            reason: reason.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn backend(reason: impl Into<CompactString>) -> Self {
        Self::Backend(reason.into())
    }

    #[must_use]
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

    /// Paths that an executor reported as failing, if any.
    #[must_use]
    pub fn failed_paths(&self) -> &[PathBuf] {
        match self {
            Self::OperationFailed { paths, .. } => paths,
            _ => &[],
        }
    }
}
