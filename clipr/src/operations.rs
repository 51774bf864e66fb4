use async_trait::async_trait;
use compact_str::CompactString;
use std::path::{Path, PathBuf};

use crate::error::ClipResult;
use crate::item::{ClipboardOperation, ClipboardSet};

/// A paste resolved against a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOperation {
    pub set_id: String,
    pub operation: ClipboardOperation,
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
}

impl PasteOperation {
    pub fn new(set: &ClipboardSet, destination: PathBuf) -> Self {
        Self {
            set_id: set.id.clone(),
            operation: set.operation,
            sources: set.to_vec(),
            destination,
        }
    }

    pub fn file_operation(&self) -> FileOperation {
        match self.operation {
            ClipboardOperation::Copy => FileOperation::Copy {
                sources: self.sources.clone(),
                destination: self.destination.clone(),
            },
            ClipboardOperation::Cut => FileOperation::Move {
                sources: self.sources.clone(),
                destination: self.destination.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    Delete {
        paths: Vec<PathBuf>,
    },
    Trash {
        paths: Vec<PathBuf>,
    },
    Rename {
        source: PathBuf,
        new_name: CompactString,
    },
    CreateDirectory {
        path: PathBuf,
    },
}

impl FileOperation {
    pub const fn operation_name(&self) -> &'static str {
        match self {
            Self::Copy { .. } => "copy",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
            Self::Trash { .. } => "trash",
            Self::Rename { .. } => "rename",
            Self::CreateDirectory { .. } => "mkdir",
        }
    }

    /// Paths the operation reads or removes.
    pub fn source_paths(&self) -> &[PathBuf] {
        match self {
            Self::Copy { sources, .. } | Self::Move { sources, .. } => sources,
            Self::Delete { paths } | Self::Trash { paths } => paths,
            Self::Rename { source, .. } => std::slice::from_ref(source),
            Self::CreateDirectory { path } => std::slice::from_ref(path),
        }
    }

    /// Directories whose listing changes once the operation completes.
    pub fn affected_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut push = |dir: Option<&Path>| {
            if let Some(dir) = dir
                && !dirs.iter().any(|known| known == dir)
            {
                dirs.push(dir.to_path_buf());
            }
        };

        match self {
            Self::Copy { destination, .. } => push(Some(destination.as_path())),
            Self::Move {
                sources,
                destination,
            } => {
                push(Some(destination.as_path()));
                sources.iter().for_each(|s| push(s.parent()));
            }
            Self::Delete { paths } | Self::Trash { paths } => {
                paths.iter().for_each(|p| push(p.parent()));
            }
            Self::Rename { source, .. } => push(source.parent()),
            Self::CreateDirectory { path } => push(path.parent()),
        }

        dirs
    }
}

/// Performs file jobs on behalf of the clipboard and the browser.
///
/// Failures carry the operation name, a message and the failing paths.
#[async_trait]
pub trait FileOperationExecutor: Send + Sync {
    async fn copy(&self, sources: &[PathBuf], destination: &Path) -> ClipResult<()>;

    async fn move_to(&self, sources: &[PathBuf], destination: &Path) -> ClipResult<()>;

    async fn delete(&self, paths: &[PathBuf]) -> ClipResult<()>;

    async fn trash(&self, paths: &[PathBuf]) -> ClipResult<()>;

    /// Renames within the same directory, returning the new path.
    async fn rename(&self, source: &Path, new_name: &str) -> ClipResult<PathBuf>;

    async fn create_directory(&self, path: &Path) -> ClipResult<()>;

    async fn execute(&self, operation: &FileOperation) -> ClipResult<()> {
        match operation {
            FileOperation::Copy {
                sources,
                destination,
            } => self.copy(sources, destination).await,
            FileOperation::Move {
                sources,
                destination,
            } => self.move_to(sources, destination).await,
            FileOperation::Delete { paths } => self.delete(paths).await,
            FileOperation::Trash { paths } => self.trash(paths).await,
            FileOperation::Rename { source, new_name } => {
                self.rename(source, new_name).await.map(|_| ())
            }
            FileOperation::CreateDirectory { path } => self.create_directory(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_paste_becomes_move() {
        let set = ClipboardSet::cut([PathBuf::from("/src/a"), PathBuf::from("/src/b")]);
        let paste = PasteOperation::new(&set, PathBuf::from("/dst"));

        assert_eq!(
            paste.file_operation(),
            FileOperation::Move {
                sources: vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")],
                destination: PathBuf::from("/dst"),
            }
        );
    }

    #[test]
    fn move_touches_source_and_destination_dirs() {
        let op = FileOperation::Move {
            sources: vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")],
            destination: PathBuf::from("/dst"),
        };

        assert_eq!(
            op.affected_directories(),
            vec![PathBuf::from("/dst"), PathBuf::from("/src")]
        );
        assert_eq!(op.operation_name(), "move");
    }
}
