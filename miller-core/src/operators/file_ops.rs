//! ``src/operators/file_ops.rs``
//! ============================================================================
//! # TokioFileOperations: default file-operation executor
//!
//! Copy, move, delete, trash, rename and mkdir on `tokio::fs`. Multi-path
//! operations keep going after a failure and report every failing path in
//! one [`ClipError::OperationFailed`].
//!
//! Pasting never clobbers: a name that is already taken in the destination
//! becomes `name (1).ext`, `name (2).ext`, ...

use async_trait::async_trait;
use clipr::{ClipError, ClipResult, FileOperationExecutor};
use compact_str::CompactString;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Instant,
};
use tokio::fs as TokioFs;
use tracing::{info, instrument, warn};

use crate::util::elapsed::saturating_millis;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileOperations;

/// Failing paths plus the first reason seen.
#[derive(Default)]
struct Failures {
    paths: Vec<PathBuf>,
    reason: Option<CompactString>,
}

impl Failures {
    fn record(&mut self, path: &Path, reason: impl std::fmt::Display) {
        warn!(
            marker = "FILE_OP_PATH_FAILED",
            operation_type = "file_operation",
            path = %path.display(),
            error = %reason,
            "path failed"
        );
        if self.reason.is_none() {
            self.reason = Some(CompactString::new(reason.to_string()));
        }
        self.paths.push(path.to_path_buf());
    }

    fn finish(self, operation: &str) -> ClipResult<()> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(ClipError::operation_failed(operation, self.paths, reason)),
        }
    }
}

/// First free `dir/name`, trying `stem (n).ext` when `name` is taken.
pub async fn unique_destination(dir: &Path, name: &std::ffi::OsStr) -> std::io::Result<PathBuf> {
    let candidate = dir.join(name);
    if !TokioFs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map_or_else(|| name.to_string_lossy(), |s| s.to_string_lossy());
    let ext = as_path.extension().map(|e| e.to_string_lossy());

    for n in 1u32.. {
        let file_name = match &ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(file_name);
        if !TokioFs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(std::io::Error::new(ErrorKind::AlreadyExists, "no free name"))
}

/// `base`, then `base 1`, `base 2`, ... whichever does not exist in `dir`.
pub async fn next_free_folder_name(dir: &Path, base: &str) -> std::io::Result<PathBuf> {
    let candidate = dir.join(base);
    if !TokioFs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    for n in 1u32.. {
        let candidate = dir.join(format!("{base} {n}"));
        if !TokioFs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(std::io::Error::new(ErrorKind::AlreadyExists, "no free name"))
}

/// Recreates the symlink `source` at `dest`, pointing at the same target.
async fn copy_link(source: &Path, dest: &Path) -> std::io::Result<()> {
    let target = TokioFs::read_link(source).await?;

    #[cfg(unix)]
    {
        TokioFs::symlink(&target, dest).await
    }

    #[cfg(windows)]
    {
        let points_at_dir = TokioFs::metadata(source).await.is_ok_and(|m| m.is_dir());
        if points_at_dir {
            TokioFs::symlink_dir(&target, dest).await
        } else {
            TokioFs::symlink_file(&target, dest).await
        }
    }
}

/// Copies a file or a whole tree to `dest`, which must not exist yet.
/// Symlinks are copied as links, never followed.
async fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<u64> {
    let metadata = TokioFs::symlink_metadata(source).await?;
    if metadata.is_symlink() {
        copy_link(source, dest).await?;
        return Ok(0);
    }
    if !metadata.is_dir() {
        return TokioFs::copy(source, dest).await;
    }

    let mut copied: u64 = 0;
    let mut stack: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), dest.to_path_buf())];

    while let Some((src_dir, dst_dir)) = stack.pop() {
        TokioFs::create_dir(&dst_dir).await?;

        let mut entries = TokioFs::read_dir(&src_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst_dir.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                copy_link(&entry.path(), &target).await?;
            } else if file_type.is_dir() {
                stack.push((entry.path(), target));
            } else {
                copied += TokioFs::copy(entry.path(), &target).await?;
            }
        }
    }

    Ok(copied)
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    if TokioFs::symlink_metadata(path).await?.is_dir() {
        TokioFs::remove_dir_all(path).await
    } else {
        TokioFs::remove_file(path).await
    }
}

fn file_name_of(path: &Path) -> std::io::Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"))
}

fn validate_name(new_name: &str) -> Result<(), &'static str> {
    if new_name.is_empty() {
        return Err("name is empty");
    }
    if new_name == "." || new_name == ".." {
        return Err("reserved name");
    }
    if new_name.contains('/') || new_name.contains('\0') {
        return Err("name contains a path separator");
    }
    Ok(())
}

impl TokioFileOperations {
    async fn copy_one(source: &Path, destination: &Path) -> std::io::Result<u64> {
        if destination.starts_with(source) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "cannot copy a directory into itself",
            ));
        }
        let target = unique_destination(destination, file_name_of(source)?).await?;
        copy_tree(source, &target).await
    }

    async fn move_one(source: &Path, destination: &Path) -> std::io::Result<()> {
        let name = file_name_of(source)?;
        if source.parent() == Some(destination) {
            // Already there.
            return Ok(());
        }
        if destination.starts_with(source) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            ));
        }

        let target = unique_destination(destination, name).await?;
        match TokioFs::rename(source, &target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                copy_tree(source, &target).await?;
                remove_path(source).await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FileOperationExecutor for TokioFileOperations {
    #[instrument(skip(self, sources, destination), fields(count = sources.len()))]
    async fn copy(&self, sources: &[PathBuf], destination: &Path) -> ClipResult<()> {
        let start_time = Instant::now();
        let mut failures = Failures::default();
        let mut bytes: u64 = 0;

        for source in sources {
            match Self::copy_one(source, destination).await {
                Ok(n) => bytes += n,
                Err(e) => failures.record(source, e),
            }
        }

        info!(
            marker = "FILE_OP_COPY",
            operation_type = "file_operation",
            destination = %destination.display(),
            items = sources.len(),
            bytes,
            duration_ms = saturating_millis(start_time.elapsed()),
            "copy finished"
        );
        failures.finish("copy")
    }

    #[instrument(skip(self, sources, destination), fields(count = sources.len()))]
    async fn move_to(&self, sources: &[PathBuf], destination: &Path) -> ClipResult<()> {
        let start_time = Instant::now();
        let mut failures = Failures::default();

        for source in sources {
            if let Err(e) = Self::move_one(source, destination).await {
                failures.record(source, e);
            }
        }

        info!(
            marker = "FILE_OP_MOVE",
            operation_type = "file_operation",
            destination = %destination.display(),
            items = sources.len(),
            duration_ms = saturating_millis(start_time.elapsed()),
            "move finished"
        );
        failures.finish("move")
    }

    #[instrument(skip(self, paths), fields(count = paths.len()))]
    async fn delete(&self, paths: &[PathBuf]) -> ClipResult<()> {
        let mut failures = Failures::default();
        for path in paths {
            if let Err(e) = remove_path(path).await {
                failures.record(path, e);
            }
        }

        info!(
            marker = "FILE_OP_DELETE",
            operation_type = "file_operation",
            items = paths.len(),
            "delete finished"
        );
        failures.finish("delete")
    }

    #[instrument(skip(self, paths), fields(count = paths.len()))]
    async fn trash(&self, paths: &[PathBuf]) -> ClipResult<()> {
        let owned = paths.to_vec();
        let result = tokio::task::spawn_blocking(move || trash::delete_all(&owned))
            .await
            .map_err(|e| ClipError::operation_failed("trash", paths.iter().cloned(), e.to_string()))?;

        result.map_err(|e| ClipError::operation_failed("trash", paths.iter().cloned(), e.to_string()))?;

        info!(
            marker = "FILE_OP_TRASH",
            operation_type = "file_operation",
            items = paths.len(),
            "moved to trash"
        );
        Ok(())
    }

    #[instrument(skip(self, source), fields(source = %source.display()))]
    async fn rename(&self, source: &Path, new_name: &str) -> ClipResult<PathBuf> {
        let fail = |reason: &str| ClipError::operation_failed("rename", [source], reason);

        validate_name(new_name).map_err(fail)?;
        let parent = source.parent().ok_or_else(|| fail("path has no parent"))?;
        let target = parent.join(new_name);

        if target == source {
            return Ok(target);
        }

        let taken = TokioFs::try_exists(&target)
            .await
            .map_err(|e| fail(&e.to_string()))?;
        if taken {
            return Err(fail("an entry with that name already exists"));
        }

        TokioFs::rename(source, &target)
            .await
            .map_err(|e| fail(&e.to_string()))?;

        info!(
            marker = "FILE_OP_RENAME",
            operation_type = "file_operation",
            target = %target.display(),
            "renamed"
        );
        Ok(target)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn create_directory(&self, path: &Path) -> ClipResult<()> {
        TokioFs::create_dir(path)
            .await
            .map_err(|e| ClipError::operation_failed("create_directory", [path], e.to_string()))
    }
}
