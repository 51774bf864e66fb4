//! ``src/operators/launcher.rs``
//!
//! Hands non-directory entries to the desktop's default application.

use compact_str::CompactString;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

pub trait Launcher: Send + Sync {
    fn open(&self, path: &Path) -> AppResult<()>;
}

/// Uses the platform opener (`xdg-open` and friends) via the `open` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, path: &Path) -> AppResult<()> {
        match open::that_detached(path) {
            Ok(()) => {
                info!(
                    marker = "FILE_OPENED",
                    operation_type = "launcher",
                    path = %path.display(),
                    "opened with default application"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    marker = "FILE_OPEN_FAILED",
                    operation_type = "launcher",
                    path = %path.display(),
                    error = %e,
                    "launcher failed"
                );
                Err(AppError::Launch {
                    path: path.to_path_buf(),
                    reason: CompactString::new(e.to_string()),
                })
            }
        }
    }
}
