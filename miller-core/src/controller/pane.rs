//! src/controller/pane.rs
//! ============================================================================
//! # Pane: one browser tab
//!
//! Binds the column stack, navigation history, keyboard gestures, clipboard
//! and the I/O seams (lister, executor, launcher, thumbnails) together. The
//! pane runs on the UI timeline: it owns its state outright and every
//! mutation goes through `&mut self`.
//!
//! Two channels leave the pane:
//! - listing completions, fed back through [`Pane::on_listing`]
//! - [`PaneSignal`]s for the UI (selection, preview, rename, job results)

use clipr::{
    ClipError, ClipResult, ClipboardCoordinator, FileOperation, FileOperationExecutor,
    PasteOperation, PasteTarget,
};
use compact_str::CompactString;
use crossterm::event::KeyEvent;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, warn};

use crate::cache::thumbnail_cache::Thumbnail;
use crate::cache::thumbnail_provider::ThumbnailProvider;
use crate::config::{BrowserSettings, Config};
use crate::controller::actions::{Action, Actions};
use crate::controller::keyboard::KeyboardState;
use crate::error::{AppError, AppResult};
use crate::fs::lister::{DirectoryLister, ListingDispatcher, ListingEvent, TokioDirectoryLister};
use crate::model::column::PendingSelect;
use crate::model::column_stack::{ColumnStack, StatusCounts};
use crate::model::history::NavigationHistory;
use crate::operators::file_ops::{TokioFileOperations, next_free_folder_name};
use crate::operators::launcher::{Launcher, SystemLauncher};

const NEW_FOLDER_NAME: &str = "New Folder";

/// Intents for the UI layer.
#[derive(Debug, Clone)]
pub enum PaneSignal {
    PreviewToggled(PathBuf),
    BeginRename(PathBuf),
    SelectionChanged(Option<PathBuf>),
    RootChanged(PathBuf),
    OperationCompleted {
        job_id: String,
        operation: &'static str,
    },
    OperationFailed {
        job_id: String,
        error: AppError,
    },
}

pub struct Pane {
    stack: ColumnStack,
    history: NavigationHistory,
    keyboard: KeyboardState,
    clipboard: ClipboardCoordinator,
    listings: ListingDispatcher,
    executor: Arc<dyn FileOperationExecutor>,
    launcher: Arc<dyn Launcher>,
    thumbnails: Option<ThumbnailProvider>,
    settings: Arc<BrowserSettings>,
    signals: UnboundedSender<PaneSignal>,
}

impl Pane {
    /// Builds a pane around the given seams. Returns the pane plus the
    /// listing and signal receivers the caller must drain.
    #[must_use]
    pub fn new(
        config: &Config,
        lister: Arc<dyn DirectoryLister>,
        executor: Arc<dyn FileOperationExecutor>,
        launcher: Arc<dyn Launcher>,
    ) -> (Self, UnboundedReceiver<ListingEvent>, UnboundedReceiver<PaneSignal>) {
        let settings = Arc::new(BrowserSettings::from(config));
        let (listings, listing_rx) = ListingDispatcher::new(lister);
        let (signals, signal_rx) = mpsc::unbounded_channel();

        let pane = Self {
            stack: ColumnStack::new(Arc::clone(&settings)),
            history: NavigationHistory::new(),
            keyboard: KeyboardState::new(settings.timing),
            clipboard: ClipboardCoordinator::default(),
            listings,
            executor,
            launcher,
            thumbnails: None,
            settings,
            signals,
        };
        (pane, listing_rx, signal_rx)
    }

    /// Pane on the real filesystem, the desktop opener and an in-process
    /// clipboard.
    #[must_use]
    pub fn with_defaults(
        config: &Config,
    ) -> (Self, UnboundedReceiver<ListingEvent>, UnboundedReceiver<PaneSignal>) {
        Self::new(
            config,
            Arc::new(TokioDirectoryLister),
            Arc::new(TokioFileOperations),
            Arc::new(SystemLauncher),
        )
    }

    #[must_use]
    pub fn with_clipboard(mut self, clipboard: ClipboardCoordinator) -> Self {
        self.clipboard = clipboard;
        self
    }

    #[must_use]
    pub fn with_thumbnails(mut self, provider: ThumbnailProvider) -> Self {
        self.thumbnails = Some(provider);
        self
    }

    #[must_use]
    pub const fn stack(&self) -> &ColumnStack {
        &self.stack
    }

    #[must_use]
    pub const fn history(&self) -> &NavigationHistory {
        &self.history
    }

    #[must_use]
    pub const fn clipboard(&self) -> &ClipboardCoordinator {
        &self.clipboard
    }

    #[must_use]
    pub const fn settings(&self) -> &Arc<BrowserSettings> {
        &self.settings
    }

    #[must_use]
    pub fn loads_in_flight(&self) -> usize {
        self.listings.in_flight()
    }

    #[must_use]
    pub fn status(&self) -> StatusCounts {
        self.stack.status()
    }

    fn signal(&self, signal: PaneSignal) {
        // Nobody listening is fine.
        let _ = self.signals.send(signal);
    }

    fn dispatch(&mut self, actions: Actions) {
        for action in actions {
            match action {
                Action::LoadColumn(request) => self.listings.request(request),
                Action::CancelLoad { column, generation } => {
                    self.listings.cancel(column, generation);
                }
                Action::OpenFile(path) => {
                    if let Err(error) = self.launcher.open(&path) {
                        self.signal(PaneSignal::OperationFailed {
                            job_id: nanoid::nanoid!(),
                            error,
                        });
                    }
                }
                Action::PreviewToggled(path) => self.signal(PaneSignal::PreviewToggled(path)),
                Action::BeginRename(path) => self.signal(PaneSignal::BeginRename(path)),
                Action::SelectionChanged(path) => self.signal(PaneSignal::SelectionChanged(path)),
                Action::RootChanged(path) => self.signal(PaneSignal::RootChanged(path)),
            }
        }
    }

    /* ----------------------------- navigation ----------------------------- */

    /// User navigation to `path`: recorded in history, stack rebuilt.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn navigate_to(&mut self, path: PathBuf) {
        self.history.record_navigation(path.clone());
        let actions = self.stack.set_root(path);
        self.dispatch(actions);
    }

    /// Returns false when there is nothing behind.
    pub fn go_back(&mut self) -> bool {
        if !self.history.can_go_back() {
            return false;
        }
        let Some(path) = self.history.back() else {
            return false;
        };
        let actions = self.stack.set_root(path);
        self.dispatch(actions);
        true
    }

    pub fn go_forward(&mut self) -> bool {
        if !self.history.can_go_forward() {
            return false;
        }
        let Some(path) = self.history.forward() else {
            return false;
        };
        let actions = self.stack.set_root(path);
        self.dispatch(actions);
        true
    }

    /// Navigates to the parent of the root, if it has one.
    pub fn go_up(&mut self) -> bool {
        let Some(parent) = self.stack.root().and_then(Path::parent).map(Path::to_path_buf) else {
            return false;
        };
        self.navigate_to(parent);
        true
    }

    pub fn go_home(&mut self) -> AppResult<()> {
        let home = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| AppError::invalid_target("no home directory"))?;
        self.navigate_to(home);
        Ok(())
    }

    /* -------------------------------- input ------------------------------- */

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let actions = self.keyboard.handle_key(&mut self.stack, key, now);
        self.dispatch(actions);
    }

    pub fn handle_click(&mut self, column: usize, entry: usize, now: Instant) {
        let actions = self.keyboard.handle_click(&mut self.stack, column, entry, now);
        self.dispatch(actions);
    }

    pub fn handle_double_click(&mut self, column: usize, entry: usize) {
        let actions = self.keyboard.handle_double_click(&mut self.stack, column, entry);
        self.dispatch(actions);
    }

    /// Applies a listing completion from the receiver returned by
    /// [`Pane::new`].
    pub fn on_listing(&mut self, event: ListingEvent) {
        self.listings.finished(event.column(), event.generation());
        let actions = self.stack.apply_listing(event);
        self.dispatch(actions);
    }

    /* ------------------------------ clipboard ----------------------------- */

    /// Stages the selection for copying. `Ok(false)` when nothing is
    /// selected.
    pub fn copy_selected(&mut self) -> AppResult<bool> {
        let staged = self.clipboard.copy_from(&self.stack);
        Self::staged_or_ignored(staged, "clipboard_copy")
    }

    pub fn cut_selected(&mut self) -> AppResult<bool> {
        let staged = self.clipboard.cut_from(&self.stack);
        Self::staged_or_ignored(staged, "clipboard_cut")
    }

    fn staged_or_ignored(staged: ClipResult<bool>, operation: &'static str) -> AppResult<bool> {
        match staged {
            Err(ClipError::EmptySelection) => {
                debug!(
                    marker = "INVALID_TARGET",
                    operation_type = operation,
                    "nothing selected"
                );
                Ok(false)
            }
            other => other.map_err(AppError::from_clip),
        }
    }

    /// Pastes the clipboard relative to `target`. `Ok(None)` when there was
    /// nothing to paste.
    #[instrument(skip(self))]
    pub async fn paste(&mut self, target: PasteTarget) -> AppResult<Option<PasteOperation>> {
        let Some(active) = self.stack.active_directory() else {
            debug!(
                marker = "INVALID_TARGET",
                operation_type = "clipboard_paste",
                "no column to paste into"
            );
            return Ok(None);
        };
        let destination = ClipboardCoordinator::resolve_paste_destination(&target, active);

        let job_id = nanoid::nanoid!();
        let executor = Arc::clone(&self.executor);
        let result = self.clipboard.paste(destination, executor.as_ref()).await;

        match result {
            Ok(None) => Ok(None),
            Ok(Some(paste)) => {
                self.finish_operation(job_id, &paste.file_operation(), Ok(()))?;
                Ok(Some(paste))
            }
            Err(e) => {
                let error = AppError::from_clip(e);
                // Without the paste description, refresh what we can see.
                if let Some(dir) = self.stack.active_directory().map(Path::to_path_buf) {
                    let actions = self.stack.refresh(&dir);
                    self.dispatch(actions);
                }
                self.signal(PaneSignal::OperationFailed {
                    job_id,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /* ---------------------------- file operations ------------------------- */

    async fn run_operation(&mut self, operation: FileOperation) -> AppResult<()> {
        let job_id = nanoid::nanoid!();
        info!(
            marker = "FILE_OP_START",
            operation_type = operation.operation_name(),
            job_id = %job_id,
            count = operation.source_paths().len(),
            "file operation started"
        );

        let result = self
            .executor
            .execute(&operation)
            .await
            .map_err(AppError::from_clip);
        self.finish_operation(job_id, &operation, result)
    }

    /// Refreshes the directories `operation` touched and reports the result.
    fn finish_operation(
        &mut self,
        job_id: String,
        operation: &FileOperation,
        result: AppResult<()>,
    ) -> AppResult<()> {
        // Partial failures still change listings.
        for dir in operation.affected_directories() {
            let actions = self.stack.refresh(&dir);
            self.dispatch(actions);
        }

        match result {
            Ok(()) => {
                self.signal(PaneSignal::OperationCompleted {
                    job_id,
                    operation: operation.operation_name(),
                });
                Ok(())
            }
            Err(error) => {
                warn!(
                    marker = "FILE_OP_FAILED",
                    operation_type = operation.operation_name(),
                    job_id = %job_id,
                    error = %error,
                    "file operation failed"
                );
                self.signal(PaneSignal::OperationFailed {
                    job_id,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Trashes or deletes the selection, per `advanced.move_to_trash`.
    /// Returns false when nothing is selected.
    ///
    /// Confirmation (`advanced.confirm_delete`) is the UI's job.
    pub async fn delete_selected(&mut self) -> AppResult<bool> {
        let paths = self.stack.selected_entries();
        if paths.is_empty() {
            debug!(
                marker = "INVALID_TARGET",
                operation_type = "delete",
                "nothing selected"
            );
            return Ok(false);
        }

        let operation = if self.settings.move_to_trash {
            FileOperation::Trash { paths }
        } else {
            FileOperation::Delete { paths }
        };
        self.run_operation(operation).await?;
        Ok(true)
    }

    /// Asks the UI to start inline rename of the selection.
    pub fn rename_selected(&mut self) -> bool {
        let Some(path) = self.stack.selected_entries().into_iter().next() else {
            debug!(
                marker = "INVALID_TARGET",
                operation_type = "rename",
                "nothing selected"
            );
            return false;
        };
        self.signal(PaneSignal::BeginRename(path));
        true
    }

    /// Finishes an inline rename and keeps the renamed entry selected.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn commit_rename(&mut self, path: &Path, new_name: &str) -> AppResult<PathBuf> {
        let job_id = nanoid::nanoid!();
        let operation = FileOperation::Rename {
            source: path.to_path_buf(),
            new_name: CompactString::new(new_name),
        };

        let renamed = match self.executor.rename(path, new_name).await {
            Ok(renamed) => renamed,
            Err(e) => {
                let error = AppError::from_clip(e);
                self.finish_operation(job_id, &operation, Err(error.clone()))?;
                return Err(error);
            }
        };

        self.finish_operation(job_id, &operation, Ok(()))?;
        if let Some(parent) = renamed.parent() {
            self.follow_entry(parent, new_name);
        }
        Ok(renamed)
    }

    /// Creates `New Folder` (or the next free `New Folder N`) in the focused
    /// column and starts renaming it.
    pub async fn create_new_folder(&mut self) -> AppResult<PathBuf> {
        let dir = self
            .stack
            .active_directory()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::invalid_target("no column to create a folder in"))?;

        let path = next_free_folder_name(&dir, NEW_FOLDER_NAME)
            .await
            .map_err(|e| AppError::from_io_at(&dir, e))?;

        self.run_operation(FileOperation::CreateDirectory { path: path.clone() })
            .await?;

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.follow_entry(&dir, name);
        }
        self.signal(PaneSignal::BeginRename(path.clone()));
        Ok(path)
    }

    /// Makes `name` the current entry of every reloading column showing `dir`.
    fn follow_entry(&mut self, dir: &Path, name: &str) {
        let columns: Vec<usize> = self
            .stack
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.path() == dir && c.is_loading())
            .map(|(i, _)| i)
            .collect();

        for index in columns {
            self.stack
                .set_pending(index, PendingSelect::Exact(CompactString::new(name)));
        }
    }

    /* ------------------------------- settings ----------------------------- */

    /// Applies a new configuration snapshot.
    pub fn reconfigure(&mut self, config: &Config) {
        let settings = Arc::new(BrowserSettings::from(config));
        if *settings == *self.settings {
            return;
        }

        self.keyboard.set_timing(settings.timing);
        self.settings = Arc::clone(&settings);
        let actions = self.stack.reconfigure(settings);
        self.dispatch(actions);
    }

    /* ------------------------------ thumbnails ---------------------------- */

    /// Thumbnail for `path`, or `None` when thumbnails are off.
    pub async fn thumbnail_for(&self, path: &Path) -> AppResult<Option<Thumbnail>> {
        match &self.thumbnails {
            Some(provider) if self.settings.show_thumbnails => {
                provider.thumbnail(path).await.map(Some)
            }
            _ => Ok(None),
        }
    }
}
