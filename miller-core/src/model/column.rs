//! src/model/column.rs
//! ============================================================================
//! # Column: one directory listing in the stack
//!
//! A column is created for a directory, starts out loading, and becomes
//! either loaded (entries present) or failed (zero entries, error flag set).
//! It has at most one current entry.
//!
//! Selection that cannot be applied yet (the listing has not arrived) is
//! kept as a [`PendingSelect`] and resolved when the listing lands. Any
//! explicit user selection drops the pending intent.

use compact_str::CompactString;
use std::path::{Path, PathBuf};

use crate::fs::entry::Entry;
use crate::fs::lister::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed(CompactString),
}

/// Deferred selection, resolved when the listing arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSelect {
    /// Select the first entry unless something is already current.
    First,
    /// Type-to-select buffer typed while loading.
    Prefix(CompactString),
    /// Keep a previously current entry across a reload.
    Exact(CompactString),
}

#[derive(Debug, Clone)]
pub struct Column {
    path: PathBuf,
    entries: Vec<Entry>,
    current: Option<usize>,
    state: LoadState,
    generation: Generation,
    pending: Option<PendingSelect>,
}

impl Column {
    /// A loading column that will select its first entry once listed.
    #[must_use]
    pub fn new(path: PathBuf, generation: Generation) -> Self {
        Self {
            path,
            entries: Vec::new(),
            current: None,
            state: LoadState::Loading,
            generation,
            pending: Some(PendingSelect::First),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current_entry(&self) -> Option<&Entry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded)
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    #[must_use]
    pub const fn has_error(&self) -> bool {
        matches!(self.state, LoadState::Failed(_))
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingSelect> {
        self.pending.as_ref()
    }

    /// Explicit selection. Drops any pending auto-select.
    pub fn set_current(&mut self, index: Option<usize>) -> bool {
        self.pending = None;
        let index = index.filter(|&i| i < self.entries.len());
        let changed = self.current != index;
        self.current = index;
        changed
    }

    pub fn set_pending(&mut self, pending: PendingSelect) {
        self.pending = Some(pending);
    }

    /// Selects the first entry if nothing is current. Deferred while loading.
    pub fn select_first_if_none(&mut self) -> bool {
        if self.current.is_some() {
            return false;
        }

        if self.is_loading() {
            self.pending = Some(PendingSelect::First);
            return false;
        }

        if self.entries.is_empty() {
            return false;
        }

        self.current = Some(0);
        true
    }

    /// Index for the type-to-select `needle`: first case-insensitive prefix
    /// match, else the first entry containing it.
    #[must_use]
    pub fn find_match(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }

        let needle = needle.to_lowercase();
        let lowered: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.name.as_str().to_lowercase())
            .collect();

        lowered
            .iter()
            .position(|name| name.starts_with(&needle))
            .or_else(|| lowered.iter().position(|name| name.contains(&needle)))
    }

    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Resets the column for a fresh load of the same directory.
    pub fn restart(&mut self, generation: Generation) {
        let keep = self
            .current_entry()
            .map(|e| PendingSelect::Exact(e.name.clone()));

        self.generation = generation;
        self.state = LoadState::Loading;
        self.pending = keep.or(self.pending.take()).or(Some(PendingSelect::First));
    }

    /// Installs a finished listing and resolves the pending selection.
    ///
    /// Returns true when the current entry changed.
    pub fn apply_listing(&mut self, entries: Vec<Entry>) -> bool {
        let previous = self.current_entry().map(|e| e.path.clone());

        self.entries = entries;
        self.state = LoadState::Loaded;

        // The old index may now point elsewhere.
        self.current = previous
            .as_ref()
            .and_then(|p| self.entries.iter().position(|e| &e.path == p));

        match self.pending.take() {
            Some(PendingSelect::First) | None => {}
            Some(PendingSelect::Prefix(buffer)) => {
                if let Some(index) = self.find_match(&buffer) {
                    self.current = Some(index);
                }
            }
            Some(PendingSelect::Exact(name)) => {
                if let Some(index) = self.position_of(&name) {
                    self.current = Some(index);
                }
            }
        }

        if self.current.is_none() && !self.entries.is_empty() {
            self.current = Some(0);
        }

        self.current_entry().map(|e| &e.path) != previous.as_ref()
    }

    /// Marks the listing as failed. The column stays, empty, with an error.
    pub fn apply_failure(&mut self, reason: impl Into<CompactString>) {
        self.entries.clear();
        self.current = None;
        self.pending = None;
        self.state = LoadState::Failed(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<Entry> {
        names
            .iter()
            .map(|n| Entry::synthetic(format!("/d/{n}"), false))
            .collect()
    }

    #[test]
    fn first_entry_selected_when_listing_arrives() {
        let mut column = Column::new("/d".into(), 1);
        assert!(column.is_loading());
        assert_eq!(column.current(), None);

        assert!(column.apply_listing(files(&["a", "b"])));
        assert!(column.is_loaded());
        assert_eq!(column.current(), Some(0));
    }

    #[test]
    fn explicit_selection_supersedes_pending() {
        let mut column = Column::new("/d".into(), 1);
        column.set_pending(PendingSelect::Prefix("b".into()));
        column.set_current(None);
        assert!(column.pending().is_none());

        column.apply_listing(files(&["a", "b"]));
        assert_eq!(column.current(), Some(0));
    }

    #[test]
    fn pending_prefix_resolves_on_load() {
        let mut column = Column::new("/d".into(), 1);
        column.set_pending(PendingSelect::Prefix("ban".into()));

        column.apply_listing(files(&["Apple", "banana", "Avocado"]));
        assert_eq!(column.current_entry().map(|e| e.name.as_str()), Some("banana"));
    }

    #[test]
    fn find_match_prefers_prefix_then_contains() {
        let mut column = Column::new("/d".into(), 1);
        column.apply_listing(files(&["Apple", "banana", "Avocado"]));

        assert_eq!(column.find_match("a"), Some(0));
        assert_eq!(column.find_match("AV"), Some(2));
        assert_eq!(column.find_match("nan"), Some(1));
        assert_eq!(column.find_match("zzz"), None);
    }

    #[test]
    fn find_match_folds_non_ascii_case() {
        let mut column = Column::new("/d".into(), 1);
        column.apply_listing(files(&["notes", "Éclair", "ÜBER"]));

        assert_eq!(column.find_match("éc"), Some(1));
        assert_eq!(column.find_match("BER"), Some(2));
    }

    #[test]
    fn restart_keeps_current_by_name() {
        let mut column = Column::new("/d".into(), 1);
        column.apply_listing(files(&["a", "b", "c"]));
        column.set_current(Some(2));

        column.restart(2);
        assert!(column.is_loading());
        assert_eq!(column.generation(), 2);

        column.apply_listing(files(&["new", "a", "b", "c"]));
        assert_eq!(column.current_entry().map(|e| e.name.as_str()), Some("c"));
    }

    #[test]
    fn failure_leaves_empty_error_column() {
        let mut column = Column::new("/locked".into(), 1);
        column.apply_failure("permission denied");

        assert!(column.has_error());
        assert!(!column.is_loaded());
        assert!(column.is_empty());
        assert_eq!(column.error(), Some("permission denied"));
        assert!(!column.select_first_if_none());
    }
}
