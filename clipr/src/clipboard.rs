use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, instrument, warn};

use crate::codec::{CodecSet, MimeData};
use crate::error::{ClipError, ClipResult};
use crate::item::{ClipboardOperation, ClipboardSet};
use crate::operations::{FileOperationExecutor, PasteOperation};

/// Anything that can report the user's current logical selection.
pub trait SelectionProvider {
    fn current_selection(&self) -> Vec<PathBuf>;
}

/// Where the system clipboard lives. Reads and writes MIME-tagged payloads.
pub trait ClipboardBackend: Send {
    fn write(&mut self, data: MimeData) -> ClipResult<()>;

    fn read(&self) -> ClipResult<Option<MimeData>>;

    fn clear(&mut self) -> ClipResult<()>;
}

/// Process-local clipboard, used when no desktop clipboard is wired in.
///
/// Clones share one slot, so several panes handed clones of the same
/// clipboard see each other's copies.
#[derive(Debug, Default, Clone)]
pub struct InMemoryClipboard {
    data: Arc<Mutex<Option<MimeData>>>,
}

impl InMemoryClipboard {
    fn slot(&self) -> ClipResult<MutexGuard<'_, Option<MimeData>>> {
        self.data
            .lock()
            .map_err(|_| ClipError::backend("in-memory clipboard lock poisoned"))
    }
}

impl ClipboardBackend for InMemoryClipboard {
    fn write(&mut self, data: MimeData) -> ClipResult<()> {
        *self.slot()? = Some(data);
        Ok(())
    }

    fn read(&self) -> ClipResult<Option<MimeData>> {
        Ok(self.slot()?.clone())
    }

    fn clear(&mut self) -> ClipResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}

/// The item the user invoked paste on, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteTarget {
    /// Paste was invoked on empty space.
    None,
    /// Paste was invoked on an entry.
    Entry { path: PathBuf, is_dir: bool },
}

/// Stages copy/cut sets and turns them into file jobs on paste.
///
/// Last writer wins: a copy or cut replaces whatever was staged before.
pub struct ClipboardCoordinator {
    current: Option<ClipboardSet>,
    codecs: CodecSet,
    backend: Box<dyn ClipboardBackend>,
}

impl std::fmt::Debug for ClipboardCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardCoordinator")
            .field("current", &self.current)
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}

impl Default for ClipboardCoordinator {
    fn default() -> Self {
        Self::new(Box::new(InMemoryClipboard::default()))
    }
}

impl ClipboardCoordinator {
    #[must_use]
    pub fn new(backend: Box<dyn ClipboardBackend>) -> Self {
        Self {
            current: None,
            codecs: CodecSet::default(),
            backend,
        }
    }

    #[must_use]
    pub fn with_codecs(mut self, codecs: CodecSet) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn current(&self) -> Option<&ClipboardSet> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.as_ref().is_none_or(ClipboardSet::is_empty)
    }

    /// Stages `urls` for copying. Returns `false` (and changes nothing) for
    /// an empty input.
    pub fn stage_copy<I>(&mut self, urls: I) -> ClipResult<bool>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.stage(ClipboardSet::copy(urls))
    }

    /// Stages `urls` for moving on the next paste.
    pub fn stage_cut<I>(&mut self, urls: I) -> ClipResult<bool>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.stage(ClipboardSet::cut(urls))
    }

    /// Stages the provider's selection for copying.
    ///
    /// Fails with [`ClipError::EmptySelection`] when nothing is selected;
    /// the staged set is left untouched.
    pub fn copy_from(&mut self, provider: &dyn SelectionProvider) -> ClipResult<bool> {
        self.stage_copy(Self::selection_of(provider)?)
    }

    pub fn cut_from(&mut self, provider: &dyn SelectionProvider) -> ClipResult<bool> {
        self.stage_cut(Self::selection_of(provider)?)
    }

    fn selection_of(provider: &dyn SelectionProvider) -> ClipResult<Vec<PathBuf>> {
        let selection = provider.current_selection();
        if selection.is_empty() {
            return Err(ClipError::EmptySelection);
        }
        Ok(selection)
    }

    #[instrument(skip(self, set), fields(operation = set.operation.verb(), count = set.len()))]
    fn stage(&mut self, set: ClipboardSet) -> ClipResult<bool> {
        if set.is_empty() {
            debug!(
                marker = "CLIPBOARD_STAGE_IGNORED",
                operation_type = "clipboard_stage",
                "nothing to stage"
            );
            return Ok(false);
        }

        let payload = self.codecs.encode_all(&set)?;
        self.backend.write(payload)?;

        info!(
            marker = "CLIPBOARD_STAGED",
            operation_type = "clipboard_stage",
            set_id = %set.id,
            operation = set.operation.verb(),
            count = set.len(),
            "clipboard set staged"
        );

        self.current = Some(set);
        Ok(true)
    }

    /// Adopts a clipboard written by another application.
    pub fn import(&mut self, data: &MimeData) -> ClipResult<bool> {
        let Some(set) = self.codecs.decode(data)? else {
            return Ok(false);
        };

        if set.is_empty() {
            return Ok(false);
        }

        self.backend.write(data.clone())?;
        self.current = Some(set);
        Ok(true)
    }

    /// Encoded form of the staged set, as written to the backend.
    pub fn export(&self) -> ClipResult<Option<MimeData>> {
        self.current
            .as_ref()
            .map(|set| self.codecs.encode_all(set))
            .transpose()
    }

    /// A directory target wins, then the clicked item's parent, then the
    /// active column's directory.
    pub fn resolve_paste_destination(target: &PasteTarget, active_directory: &Path) -> PathBuf {
        match target {
            PasteTarget::Entry { path, is_dir: true } => path.clone(),
            PasteTarget::Entry { path, is_dir: false } => path
                .parent()
                .map_or_else(|| active_directory.to_path_buf(), Path::to_path_buf),
            PasteTarget::None => active_directory.to_path_buf(),
        }
    }

    /// The set a paste should use right now.
    ///
    /// The backend wins when it holds a file list, since another application
    /// may have written it after our last stage.
    fn effective_set(&self) -> Option<ClipboardSet> {
        match self.backend.read() {
            Ok(Some(data)) => match self.codecs.decode(&data) {
                Ok(Some(set)) if !set.is_empty() => {
                    if let Some(own) = &self.current
                        && own.same_contents(&set)
                    {
                        return Some(own.clone());
                    }
                    Some(set)
                }
                Ok(_) => self.current.clone(),
                Err(e) => {
                    warn!(
                        marker = "CLIPBOARD_DECODE_FAILED",
                        operation_type = "clipboard_paste",
                        error = %e,
                        "falling back to staged set"
                    );
                    self.current.clone()
                }
            },
            Ok(None) => self.current.clone(),
            Err(e) => {
                warn!(
                    marker = "CLIPBOARD_BACKEND_FAILED",
                    operation_type = "clipboard_paste",
                    error = %e,
                    "falling back to staged set"
                );
                self.current.clone()
            }
        }
    }

    /// Resolves the paste job for `destination` without running it.
    ///
    /// A cut clipboard is cleared here, before the move runs, and is not
    /// restored if the move later fails. Fails with
    /// [`ClipError::EmptyClipboard`] when there is nothing to paste.
    pub fn take_paste(&mut self, destination: PathBuf) -> ClipResult<PasteOperation> {
        let set = self
            .effective_set()
            .filter(|set| !set.is_empty())
            .ok_or(ClipError::EmptyClipboard)?;

        let paste = PasteOperation::new(&set, destination);

        match set.operation {
            ClipboardOperation::Cut => {
                self.current = None;
                if let Err(e) = self.backend.clear() {
                    warn!(
                        marker = "CLIPBOARD_BACKEND_FAILED",
                        operation_type = "clipboard_clear",
                        error = %e,
                        "could not clear system clipboard after cut"
                    );
                }
            }
            ClipboardOperation::Copy => {
                self.current = Some(set);
            }
        }

        Ok(paste)
    }

    /// Pastes into `destination` using `executor`.
    ///
    /// Returns `Ok(None)` when there is nothing to paste.
    #[instrument(skip(self, executor, destination), fields(destination = %destination.display()))]
    pub async fn paste(
        &mut self,
        destination: PathBuf,
        executor: &dyn FileOperationExecutor,
    ) -> ClipResult<Option<PasteOperation>> {
        let paste = match self.take_paste(destination) {
            Ok(paste) => paste,
            Err(ClipError::EmptyClipboard) => {
                debug!(
                    marker = "CLIPBOARD_PASTE_IGNORED",
                    operation_type = "clipboard_paste",
                    "clipboard is empty"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let job = paste.file_operation();
        match executor.execute(&job).await {
            Ok(()) => {
                info!(
                    marker = "CLIPBOARD_PASTED",
                    operation_type = job.operation_name(),
                    count = paste.sources.len(),
                    destination = %paste.destination.display(),
                    "paste completed"
                );
                Ok(Some(paste))
            }
            Err(e) => {
                warn!(
                    marker = "CLIPBOARD_PASTE_FAILED",
                    operation_type = job.operation_name(),
                    error = %e,
                    "paste failed"
                );
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) -> ClipResult<()> {
        self.current = None;
        self.backend.clear()
    }
}
