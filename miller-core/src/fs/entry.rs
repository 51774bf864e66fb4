//! ``src/fs/entry.rs``
//!
//! # `Entry`: one row of a column
//!
//! Light, clonable metadata for a directory child. Columns keep entries in
//! display order: directories first, then by name ignoring case.

use chrono::{DateTime, Local};
use compact_str::CompactString;
use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: CompactString,
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl Entry {
    /// Reads metadata for `path`. Symlinks resolve to their target's kind
    /// when `follow_symlinks` is set.
    pub async fn from_path(path: &Path, follow_symlinks: bool) -> Result<Self, AppError> {
        let link_meta = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| AppError::from_io_at(path, e))?;
        let is_symlink = link_meta.file_type().is_symlink();

        let meta = if is_symlink && follow_symlinks {
            // Dangling links keep their own metadata.
            tokio::fs::metadata(path).await.unwrap_or(link_meta)
        } else {
            link_meta
        };

        Ok(Self {
            name: file_name_of(path),
            path: path.to_path_buf(),
            is_dir: meta.is_dir(),
            is_symlink,
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    /// Entry built without touching the filesystem.
    pub fn synthetic(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            is_dir,
            is_symlink: false,
            size: 0,
            modified: None,
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Name with the extension removed, for views that hide extensions.
    #[must_use]
    pub fn display_name(&self, show_extension: bool) -> &str {
        if show_extension || self.is_dir {
            return &self.name;
        }

        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(dot) => &self.name[..dot],
        }
    }

    /// Modification time in local time, `strftime`-style `fmt`.
    #[must_use]
    pub fn format_modified(&self, fmt: &str) -> Option<String> {
        self.modified
            .map(|time| DateTime::<Local>::from(time).format(fmt).to_string())
    }
}

fn file_name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::from(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::from(path.to_string_lossy()))
}

/// Display order: directories first, then case-insensitive name, then the
/// exact name so the order is total.
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(compare_entries);
}
