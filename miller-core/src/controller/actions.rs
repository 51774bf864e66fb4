//! src/controller/actions.rs
//! ============================================================================
//! # Actions: side effects requested by the browser state machines
//!
//! The column stack and the keyboard state machine never perform I/O. They
//! return [`Action`]s and the pane carries them out: listings are started or
//! cancelled, files handed to the launcher, and UI-facing intents forwarded.

use smallvec::SmallVec;
use std::path::PathBuf;

use crate::fs::lister::{Generation, ListingRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start listing a column's directory.
    LoadColumn(ListingRequest),

    /// Abandon the listing of a destroyed or restarted column.
    CancelLoad { column: usize, generation: Generation },

    /// Hand a file to the launcher.
    OpenFile(PathBuf),

    /// Show or hide the quick preview for this entry.
    PreviewToggled(PathBuf),

    /// Start inline rename of this entry.
    BeginRename(PathBuf),

    /// The focused selection changed; `None` when nothing is selected.
    SelectionChanged(Option<PathBuf>),

    /// The stack was rebuilt around a new root.
    RootChanged(PathBuf),
}

impl Action {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoadColumn(_) => "load_column",
            Self::CancelLoad { .. } => "cancel_load",
            Self::OpenFile(_) => "open_file",
            Self::PreviewToggled(_) => "preview_toggled",
            Self::BeginRename(_) => "begin_rename",
            Self::SelectionChanged(_) => "selection_changed",
            Self::RootChanged(_) => "root_changed",
        }
    }
}

/// Most operations produce a handful of actions.
pub type Actions = SmallVec<[Action; 4]>;
