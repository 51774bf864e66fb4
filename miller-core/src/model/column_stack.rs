//! src/model/column_stack.rs
//! ============================================================================
//! # ColumnStack: the drill-down column sequence
//!
//! `stack[0]` is the root directory; every later column lists the directory
//! currently selected in the column before it. The stack owns its columns
//! outright and all cross-column work runs top-down from here.
//!
//! Operations return [`Actions`] instead of doing I/O. Listings complete
//! asynchronously and come back through [`ColumnStack::apply_listing`],
//! which drops anything whose generation or path no longer matches.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clipr::SelectionProvider;
use tracing::{debug, info, instrument, trace};

use crate::config::BrowserSettings;
use crate::controller::actions::{Action, Actions};
use crate::fs::lister::{Generation, ListOptions, ListingEvent, ListingRequest};
use crate::model::column::{Column, PendingSelect};

/// Counts shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub entries: usize,
    pub selected: usize,
}

#[derive(Debug)]
pub struct ColumnStack {
    columns: Vec<Column>,
    focus: usize,
    next_generation: Generation,
    settings: Arc<BrowserSettings>,
}

impl ColumnStack {
    /// An empty stack; call [`set_root`](Self::set_root) to populate it.
    #[must_use]
    pub fn new(settings: Arc<BrowserSettings>) -> Self {
        Self {
            columns: Vec::new(),
            focus: 0,
            next_generation: 0,
            settings,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.columns.first().map(Column::path)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Column> {
        self.columns.last()
    }

    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }

    #[must_use]
    pub fn focused_column(&self) -> Option<&Column> {
        self.columns.get(self.focus)
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<BrowserSettings> {
        &self.settings
    }

    /// Moves keyboard focus without touching selection.
    pub fn set_focus(&mut self, column: usize) -> bool {
        if column < self.columns.len() {
            self.focus = column;
            true
        } else {
            false
        }
    }

    /// Directory of the focused column, the default paste destination.
    #[must_use]
    pub fn active_directory(&self) -> Option<&Path> {
        self.focused_column().map(Column::path)
    }

    #[must_use]
    pub fn status(&self) -> StatusCounts {
        self.focused_column()
            .map(|c| StatusCounts {
                entries: c.len(),
                selected: usize::from(c.current().is_some()),
            })
            .unwrap_or_default()
    }

    /// The logical selection for file operations: the current entry of the
    /// deepest column.
    #[must_use]
    pub fn selected_entries(&self) -> Vec<PathBuf> {
        self.columns
            .last()
            .and_then(Column::current_entry)
            .map(|e| vec![e.path.clone()])
            .unwrap_or_default()
    }

    fn bump_generation(&mut self) -> Generation {
        self.next_generation += 1;
        self.next_generation
    }

    fn list_options(&self) -> ListOptions {
        ListOptions {
            show_hidden: self.settings.show_hidden,
            follow_symlinks: self.settings.follow_symlinks,
        }
    }

    fn load_request(&self, index: usize) -> Option<ListingRequest> {
        self.columns.get(index).map(|c| ListingRequest {
            column: index,
            generation: c.generation(),
            path: c.path().to_path_buf(),
            options: self.list_options(),
        })
    }

    fn push_load(&self, index: usize, actions: &mut Actions) {
        if let Some(request) = self.load_request(index) {
            actions.push(Action::LoadColumn(request));
        }
    }

    fn invalid_target(operation: &str, column: usize, entry: Option<usize>) -> Actions {
        debug!(
            marker = "INVALID_TARGET",
            operation_type = operation,
            column,
            entry = ?entry,
            "ignored operation on missing column or entry"
        );
        Actions::new()
    }

    /// Drops every column from `len` on, cancelling their listings.
    fn truncate(&mut self, len: usize, actions: &mut Actions) {
        for (index, column) in self.columns.iter().enumerate().skip(len) {
            if column.is_loading() {
                actions.push(Action::CancelLoad {
                    column: index,
                    generation: column.generation(),
                });
            }
        }

        self.columns.truncate(len);
        if self.focus >= len {
            self.focus = len.saturating_sub(1);
        }
    }

    fn selection_action(&self) -> Action {
        Action::SelectionChanged(
            self.focused_column()
                .and_then(Column::current_entry)
                .map(|e| e.path.clone()),
        )
    }

    /// Replaces the whole stack with a single column for `path`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn set_root(&mut self, path: PathBuf) -> Actions {
        let mut actions = Actions::new();
        self.truncate(0, &mut actions);

        let generation = self.bump_generation();
        self.columns.push(Column::new(path.clone(), generation));
        self.focus = 0;

        info!(
            marker = "ROOT_SET",
            operation_type = "column_stack",
            generation,
            "stack rebuilt around new root"
        );

        actions.push(Action::RootChanged(path));
        actions.push(Action::SelectionChanged(None));
        self.push_load(0, &mut actions);
        actions
    }

    /// Opens `entry` of `column`: a directory becomes a new last column, a
    /// file is handed to the launcher without touching the stack.
    #[instrument(skip(self))]
    pub fn drill_into(&mut self, column: usize, entry: usize) -> Actions {
        let Some(target) = self.columns.get(column).and_then(|c| c.entry(entry)).cloned() else {
            return Self::invalid_target("drill_into", column, Some(entry));
        };

        if !target.is_dir {
            let mut actions = Actions::new();
            actions.push(Action::OpenFile(target.path));
            return actions;
        }

        let mut actions = self.prune_after(column);
        self.columns[column].set_current(Some(entry));

        let generation = self.bump_generation();
        self.columns.push(Column::new(target.path, generation));
        self.focus = column + 1;

        debug!(
            marker = "COLUMN_PUSHED",
            operation_type = "column_stack",
            depth = self.columns.len(),
            generation,
            "drilled into directory"
        );

        self.push_load(column + 1, &mut actions);
        actions
    }

    /// Destroys every column strictly after `column`.
    pub fn prune_after(&mut self, column: usize) -> Actions {
        let mut actions = Actions::new();
        if column >= self.columns.len() {
            return actions;
        }

        self.truncate(column + 1, &mut actions);
        actions
    }

    /// Removes the last column unless it is the root.
    pub fn collapse_last(&mut self) -> Actions {
        if self.columns.len() <= 1 {
            return Self::invalid_target("collapse_last", self.columns.len(), None);
        }

        let mut actions = Actions::new();
        let last = self.columns.len() - 1;
        self.truncate(last, &mut actions);
        self.focus = last - 1;

        if let Some(column) = self.columns.last_mut() {
            column.select_first_if_none();
        }

        actions.push(self.selection_action());
        actions
    }

    /// Explicit selection of `entry` in `column` (click or arrow keys).
    ///
    /// Changing the selection in a non-last column prunes the columns after
    /// it, since they listed the previously selected directory.
    pub fn select_entry(&mut self, column: usize, entry: usize) -> Actions {
        let Some(col) = self.columns.get_mut(column) else {
            return Self::invalid_target("select_entry", column, Some(entry));
        };
        if entry >= col.len() {
            return Self::invalid_target("select_entry", column, Some(entry));
        }

        col.set_current(Some(entry));
        self.focus = column;

        let selected = self.columns[column].current_entry().map(|e| e.path.clone());
        let child_matches = self
            .columns
            .get(column + 1)
            .is_some_and(|child| Some(child.path()) == selected.as_deref());

        let mut actions = if child_matches {
            Actions::new()
        } else {
            self.prune_after(column)
        };

        actions.push(Action::SelectionChanged(selected));
        actions
    }

    /// Moves the current entry of `column` by `delta`, clamped to the list.
    pub fn move_current(&mut self, column: usize, delta: isize) -> Actions {
        let Some(col) = self.columns.get(column) else {
            return Self::invalid_target("move_current", column, None);
        };
        if col.is_empty() {
            return Actions::new();
        }

        let target = match col.current() {
            Some(current) => current.saturating_add_signed(delta).min(col.len() - 1),
            None if delta < 0 => col.len() - 1,
            None => 0,
        };

        if col.current() == Some(target) {
            return Actions::new();
        }
        self.select_entry(column, target)
    }

    pub fn select_first(&mut self, column: usize) -> Actions {
        self.select_entry(column, 0)
    }

    pub fn select_last(&mut self, column: usize) -> Actions {
        let last = self
            .columns
            .get(column)
            .map_or(0, |c| c.len().saturating_sub(1));
        self.select_entry(column, last)
    }

    /// Records a type-to-select or auto-select intent for a loading column.
    pub fn set_pending(&mut self, column: usize, pending: PendingSelect) {
        if let Some(col) = self.columns.get_mut(column) {
            col.set_pending(pending);
        }
    }

    /// Applies a listing completion if it is still wanted.
    pub fn apply_listing(&mut self, event: ListingEvent) -> Actions {
        let index = event.column();
        let wanted = self.columns.get(index).is_some_and(|c| {
            c.is_loading() && c.generation() == event.generation() && c.path() == event.path()
        });

        if !wanted {
            trace!(
                marker = "STALE_COMPLETION",
                operation_type = "column_stack",
                column = index,
                generation = event.generation(),
                "discarding stale listing"
            );
            return Actions::new();
        }

        let mut actions = Actions::new();
        let changed = match event {
            ListingEvent::Loaded { entries, .. } => {
                let count = entries.len();
                let changed = self.columns[index].apply_listing(entries);
                debug!(
                    marker = "COLUMN_LOADED",
                    operation_type = "column_stack",
                    column = index,
                    entries = count,
                    "listing applied"
                );
                changed
            }
            ListingEvent::Failed { error, .. } => {
                self.columns[index].apply_failure(error.to_string());
                true
            }
        };

        // Deeper columns only survive if they still list the current entry.
        let current = self.columns[index].current_entry().map(|e| e.path.clone());
        let child_matches = self
            .columns
            .get(index + 1)
            .is_some_and(|child| Some(child.path()) == current.as_deref());
        if !child_matches {
            actions.extend(self.prune_after(index));
        }

        if changed && index == self.focus {
            actions.push(self.selection_action());
        }
        actions
    }

    /// Swaps the settings snapshot and reloads every column.
    pub fn reconfigure(&mut self, settings: Arc<BrowserSettings>) -> Actions {
        let reload = settings.show_hidden != self.settings.show_hidden
            || settings.follow_symlinks != self.settings.follow_symlinks;
        self.settings = settings;

        let mut actions = Actions::new();
        if reload {
            for index in 0..self.columns.len() {
                self.restart_column(index, &mut actions);
            }
        }
        actions
    }

    /// Reloads every column showing `path`.
    pub fn refresh(&mut self, path: &Path) -> Actions {
        let mut actions = Actions::new();
        for index in 0..self.columns.len() {
            if self.columns[index].path() == path {
                self.restart_column(index, &mut actions);
            }
        }
        actions
    }

    fn restart_column(&mut self, index: usize, actions: &mut Actions) {
        let old = &self.columns[index];
        if old.is_loading() {
            actions.push(Action::CancelLoad {
                column: index,
                generation: old.generation(),
            });
        }

        let generation = self.bump_generation();
        self.columns[index].restart(generation);
        self.push_load(index, actions);
    }
}

impl SelectionProvider for ColumnStack {
    fn current_selection(&self) -> Vec<PathBuf> {
        self.selected_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::fs::entry::Entry;

    fn stack() -> ColumnStack {
        ColumnStack::new(Arc::new(BrowserSettings::default()))
    }

    fn load(stack: &mut ColumnStack, index: usize, children: &[(&str, bool)]) -> Actions {
        let column = stack.column(index).unwrap();
        let base = column.path().to_path_buf();
        let generation = column.generation();
        let entries = children
            .iter()
            .map(|(name, is_dir)| Entry::synthetic(base.join(name), *is_dir))
            .collect();
        stack.apply_listing(ListingEvent::Loaded {
            column: index,
            generation,
            path: base,
            entries,
        })
    }

    fn loads(actions: &Actions) -> Vec<&ListingRequest> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::LoadColumn(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn set_root_creates_single_loading_column() {
        let mut stack = stack();
        let actions = stack.set_root("/home/u".into());

        assert_eq!(stack.len(), 1);
        assert!(stack.column(0).unwrap().is_loading());
        assert_eq!(actions[0], Action::RootChanged("/home/u".into()));
        assert_eq!(loads(&actions).len(), 1);
        assert_eq!(loads(&actions)[0].path, PathBuf::from("/home/u"));
    }

    #[test]
    fn drill_appends_child_column() {
        let mut stack = stack();
        stack.set_root("/home/u".into());
        load(&mut stack, 0, &[("Documents", true), ("notes.txt", false)]);

        let actions = stack.drill_into(0, 0);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.column(1).unwrap().path(), Path::new("/home/u/Documents"));
        assert_eq!(stack.column(0).unwrap().current(), Some(0));
        assert_eq!(stack.focus(), 1);
        assert_eq!(loads(&actions)[0].column, 1);
    }

    #[test]
    fn drill_from_middle_prunes_deeper_columns() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true), ("b", true)]);
        stack.drill_into(0, 0);
        load(&mut stack, 1, &[("x", true)]);
        stack.drill_into(1, 0);
        assert_eq!(stack.len(), 3);

        stack.drill_into(0, 1);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.column(1).unwrap().path(), Path::new("/r/b"));
    }

    #[test]
    fn prune_then_drill_matches_plain_drill() {
        let build = |prune_first: bool| {
            let mut stack = stack();
            stack.set_root("/r".into());
            load(&mut stack, 0, &[("a", true), ("b", true)]);
            stack.drill_into(0, 0);
            load(&mut stack, 1, &[("x", true)]);
            stack.drill_into(1, 0);
            if prune_first {
                stack.prune_after(0);
            }
            stack.drill_into(0, 1);
            stack
                .columns()
                .iter()
                .map(|c| c.path().to_path_buf())
                .collect::<Vec<_>>()
        };

        assert_eq!(build(true), build(false));
    }

    #[test]
    fn prune_is_idempotent() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true)]);
        stack.drill_into(0, 0);

        stack.prune_after(0);
        let once: Vec<PathBuf> = stack.columns().iter().map(|c| c.path().into()).collect();
        let actions = stack.prune_after(0);
        let twice: Vec<PathBuf> = stack.columns().iter().map(|c| c.path().into()).collect();

        assert_eq!(once, twice);
        assert!(actions.is_empty());
    }

    #[test]
    fn drilling_a_file_opens_it() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("f.txt", false)]);

        let actions = stack.drill_into(0, 0);
        assert_eq!(actions.as_slice(), &[Action::OpenFile("/r/f.txt".into())]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn invalid_targets_are_ignored() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true)]);

        assert!(stack.drill_into(3, 0).is_empty());
        assert!(stack.drill_into(0, 9).is_empty());
        assert!(stack.select_entry(0, 9).is_empty());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut stack = stack();
        stack.set_root("/r".into());
        let old_generation = stack.column(0).unwrap().generation();
        stack.set_root("/other".into());

        let actions = stack.apply_listing(ListingEvent::Loaded {
            column: 0,
            generation: old_generation,
            path: "/r".into(),
            entries: vec![Entry::synthetic("/r/a", true)],
        });

        assert!(actions.is_empty());
        assert!(stack.column(0).unwrap().is_loading());
        assert!(stack.column(0).unwrap().is_empty());
    }

    #[test]
    fn repeated_completion_is_ignored() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true), ("b", true)]);
        stack.select_entry(0, 1);

        load(&mut stack, 0, &[("z", true)]);
        assert_eq!(stack.column(0).unwrap().len(), 2);
        assert_eq!(stack.column(0).unwrap().current(), Some(1));
    }

    #[test]
    fn failed_listing_leaves_error_column() {
        let mut stack = stack();
        stack.set_root("/r".into());
        let generation = stack.column(0).unwrap().generation();

        stack.apply_listing(ListingEvent::Failed {
            column: 0,
            generation,
            path: "/r".into(),
            error: AppError::listing_failed("/r", "permission denied"),
        });

        let column = stack.column(0).unwrap();
        assert!(column.has_error());
        assert!(column.is_empty());
        assert!(stack.selected_entries().is_empty());
    }

    #[test]
    fn collapse_last_never_removes_root() {
        let mut stack = stack();
        stack.set_root("/r".into());
        assert!(stack.collapse_last().is_empty());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn collapse_selects_first_entry_when_parent_has_none() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true), ("b", false)]);
        stack.drill_into(0, 0);
        load(&mut stack, 1, &[("x", false)]);
        stack.columns[0].set_current(None);

        let actions = stack.collapse_last();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.focus(), 0);
        assert_eq!(stack.column(0).unwrap().current(), Some(0));
        assert!(actions.contains(&Action::SelectionChanged(Some("/r/a".into()))));
    }

    #[test]
    fn collapse_onto_loading_column_selects_on_completion() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true), ("b", false)]);
        stack.drill_into(0, 0);
        stack.columns[0].set_current(None);
        stack.refresh(Path::new("/r"));
        assert!(stack.column(0).unwrap().is_loading());

        let actions = stack.collapse_last();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.column(0).unwrap().current(), None);
        assert!(actions.contains(&Action::SelectionChanged(None)));

        let actions = load(&mut stack, 0, &[("a", true), ("b", false)]);
        assert_eq!(stack.column(0).unwrap().current(), Some(0));
        assert!(actions.contains(&Action::SelectionChanged(Some("/r/a".into()))));
    }

    #[test]
    fn selecting_elsewhere_prunes_stale_children() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", true), ("b", true)]);
        stack.drill_into(0, 0);

        stack.select_entry(0, 0);
        assert_eq!(stack.len(), 2, "same entry keeps its child column");

        let actions = stack.select_entry(0, 1);
        assert_eq!(stack.len(), 1);
        assert!(actions.contains(&Action::SelectionChanged(Some("/r/b".into()))));
    }

    #[test]
    fn move_current_clamps() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", false), ("b", false), ("c", false)]);

        stack.move_current(0, 5);
        assert_eq!(stack.column(0).unwrap().current(), Some(2));
        stack.move_current(0, -10);
        assert_eq!(stack.column(0).unwrap().current(), Some(0));
        assert!(stack.move_current(0, -1).is_empty());
    }

    #[test]
    fn refresh_reloads_matching_columns_keeping_selection() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", false), ("b", false)]);
        stack.select_entry(0, 1);

        let actions = stack.refresh(Path::new("/r"));
        assert_eq!(loads(&actions).len(), 1);

        load(&mut stack, 0, &[("0-new", false), ("a", false), ("b", false)]);
        assert_eq!(
            stack.column(0).unwrap().current_entry().map(|e| e.name.as_str()),
            Some("b")
        );
    }

    #[test]
    fn reconfigure_reloads_only_when_listing_changes() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", false)]);

        let same = Arc::new(BrowserSettings::default());
        assert!(stack.reconfigure(same).is_empty());

        let hidden = Arc::new(BrowserSettings {
            show_hidden: true,
            ..BrowserSettings::default()
        });
        let actions = stack.reconfigure(hidden);
        let requests = loads(&actions);
        assert_eq!(requests.len(), 1);
        assert!(requests[0].options.show_hidden);
    }

    #[test]
    fn status_counts_focused_column() {
        let mut stack = stack();
        stack.set_root("/r".into());
        load(&mut stack, 0, &[("a", false), ("b", false)]);

        assert_eq!(
            stack.status(),
            StatusCounts {
                entries: 2,
                selected: 1
            }
        );
    }
}
