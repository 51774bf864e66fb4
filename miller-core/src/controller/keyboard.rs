//! src/controller/keyboard.rs
//! ============================================================================
//! # KeyboardState: key and mouse gestures over the column stack
//!
//! Pure state machine. Every input carries the caller's `now` so the
//! time-based gestures (type-to-select, slow second click) are testable
//! without sleeping. The result is a list of [`Actions`] for the pane.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tracing::{instrument, trace};

use crate::config::KeyTiming;
use crate::controller::actions::{Action, Actions};
use crate::model::column::PendingSelect;
use crate::model::column_stack::ColumnStack;
use crate::util::click_timer::RenameClickTimer;
use crate::util::type_select::TypeSelectBuffer;

#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    search: TypeSelectBuffer,
    clicks: RenameClickTimer,
    timing: KeyTiming,
}

impl KeyboardState {
    #[must_use]
    pub fn new(timing: KeyTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn set_timing(&mut self, timing: KeyTiming) {
        self.timing = timing;
    }

    #[must_use]
    pub const fn timing(&self) -> &KeyTiming {
        &self.timing
    }

    #[must_use]
    pub fn search_buffer(&self) -> &str {
        self.search.as_str()
    }

    #[instrument(level = "trace", skip(self, stack), fields(code = ?key.code))]
    pub fn handle_key(&mut self, stack: &mut ColumnStack, key: KeyEvent, now: Instant) -> Actions {
        self.clicks.invalidate();

        let Some(column) = stack.focused_column() else {
            return Actions::new();
        };
        let focus = stack.focus();
        let current = column.current();
        let current_entry = column.current_entry().cloned();

        if let Some(ch) = printable(&key) {
            return self.type_select(stack, focus, ch, now);
        }
        self.search.reset();

        match key.code {
            KeyCode::Right => match (current, current_entry) {
                (Some(index), Some(entry)) if entry.is_dir => stack.drill_into(focus, index),
                _ => Actions::new(),
            },

            KeyCode::Enter => match current {
                Some(index) => stack.drill_into(focus, index),
                None => Actions::new(),
            },

            KeyCode::Left => {
                if focus + 1 == stack.len() && stack.len() > 1 {
                    stack.collapse_last()
                } else {
                    Actions::new()
                }
            }

            KeyCode::Char(' ') => {
                let mut actions = Actions::new();
                if let Some(entry) = current_entry {
                    actions.push(Action::PreviewToggled(entry.path));
                }
                actions
            }

            KeyCode::Up => stack.move_current(focus, -1),
            KeyCode::Down => stack.move_current(focus, 1),
            KeyCode::Home => stack.select_first(focus),
            KeyCode::End => stack.select_last(focus),

            _ => {
                trace!(
                    marker = "KEY_UNHANDLED",
                    operation_type = "input_handling",
                    "no binding"
                );
                Actions::new()
            }
        }
    }

    fn type_select(&mut self, stack: &mut ColumnStack, focus: usize, ch: char, now: Instant) -> Actions {
        let needle = self
            .search
            .push(ch, now, self.timing.type_select_timeout)
            .to_owned();

        let Some(column) = stack.column(focus) else {
            return Actions::new();
        };

        if column.is_loading() {
            stack.set_pending(focus, PendingSelect::Prefix(needle.into()));
            return Actions::new();
        }

        match column.find_match(&needle) {
            Some(index) if column.current() != Some(index) => stack.select_entry(focus, index),
            _ => Actions::new(),
        }
    }

    /// Single click on `entry` of `column`.
    #[instrument(level = "trace", skip(self, stack))]
    pub fn handle_click(
        &mut self,
        stack: &mut ColumnStack,
        column: usize,
        entry: usize,
        now: Instant,
    ) -> Actions {
        self.search.reset();

        let Some(col) = stack.column(column) else {
            self.clicks.invalidate();
            return Actions::new();
        };
        let Some(target) = col.entry(entry).map(|e| e.path.clone()) else {
            self.clicks.invalidate();
            return Actions::new();
        };
        let was_current = col.current() == Some(entry);

        if was_current && self.clicks.click(column, entry, now, &self.timing) {
            stack.set_focus(column);
            let mut actions = Actions::new();
            actions.push(Action::BeginRename(target));
            return actions;
        }

        if !was_current {
            self.clicks.arm(column, entry, now);
        }
        stack.select_entry(column, entry)
    }

    /// Double click behaves like Enter on the clicked entry.
    pub fn handle_double_click(
        &mut self,
        stack: &mut ColumnStack,
        column: usize,
        entry: usize,
    ) -> Actions {
        self.clicks.invalidate();
        self.search.reset();

        if stack.column(column).and_then(|c| c.entry(entry)).is_none() {
            return Actions::new();
        }

        let mut actions = stack.select_entry(column, entry);
        actions.extend(stack.drill_into(column, entry));
        actions
    }
}

/// Characters that feed type-to-select: no modifier other than Shift.
fn printable(key: &KeyEvent) -> Option<char> {
    let KeyCode::Char(ch) = key.code else {
        return None;
    };
    if ch == ' ' || ch.is_control() {
        return None;
    }
    key.modifiers
        .difference(KeyModifiers::SHIFT)
        .is_empty()
        .then_some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserSettings;
    use crate::fs::entry::Entry;
    use crate::fs::lister::ListingEvent;
    use std::{path::Path, sync::Arc, time::Duration};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn load(stack: &mut ColumnStack, index: usize, children: &[(&str, bool)]) {
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
        });
    }

    fn setup(children: &[(&str, bool)]) -> (KeyboardState, ColumnStack) {
        let mut stack = ColumnStack::new(Arc::new(BrowserSettings::default()));
        stack.set_root("/r".into());
        load(&mut stack, 0, children);
        (KeyboardState::default(), stack)
    }

    fn current_name(stack: &ColumnStack) -> Option<String> {
        stack
            .focused_column()
            .and_then(|c| c.current_entry())
            .map(|e| e.name.to_string())
    }

    #[test]
    fn type_to_select_prefix_then_contains() {
        let (mut keys, mut stack) = setup(&[("Apple", false), ("banana", false), ("Avocado", false)]);
        let t0 = Instant::now();

        keys.handle_key(&mut stack, key(KeyCode::Char('a')), t0);
        assert_eq!(current_name(&stack).as_deref(), Some("Apple"));

        keys.handle_key(&mut stack, key(KeyCode::Char('v')), t0 + ms(300));
        assert_eq!(current_name(&stack).as_deref(), Some("Avocado"));

        keys.handle_key(&mut stack, key(KeyCode::Char('n')), t0 + ms(1500));
        assert_eq!(keys.search_buffer(), "n");
        assert_eq!(current_name(&stack).as_deref(), Some("banana"));
    }

    #[test]
    fn shift_is_allowed_but_ctrl_is_not() {
        let (mut keys, mut stack) = setup(&[("a", false), ("Bee", false)]);
        let t0 = Instant::now();

        keys.handle_key(
            &mut stack,
            KeyEvent::new(KeyCode::Char('C'), KeyModifiers::CONTROL),
            t0,
        );
        assert_eq!(keys.search_buffer(), "");

        keys.handle_key(
            &mut stack,
            KeyEvent::new(KeyCode::Char('B'), KeyModifiers::SHIFT),
            t0,
        );
        assert_eq!(current_name(&stack).as_deref(), Some("Bee"));
    }

    #[test]
    fn typing_while_loading_resolves_on_completion() {
        let mut stack = ColumnStack::new(Arc::new(BrowserSettings::default()));
        stack.set_root("/r".into());
        let mut keys = KeyboardState::default();

        keys.handle_key(&mut stack, key(KeyCode::Char('b')), Instant::now());
        load(&mut stack, 0, &[("Apple", false), ("banana", false)]);

        assert_eq!(current_name(&stack).as_deref(), Some("banana"));
    }

    #[test]
    fn right_ignores_files_enter_opens_them() {
        let (mut keys, mut stack) = setup(&[("f.txt", false)]);
        let now = Instant::now();

        assert!(keys.handle_key(&mut stack, key(KeyCode::Right), now).is_empty());

        let actions = keys.handle_key(&mut stack, key(KeyCode::Enter), now);
        assert_eq!(actions.as_slice(), &[Action::OpenFile("/r/f.txt".into())]);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn right_drills_left_collapses() {
        let (mut keys, mut stack) = setup(&[("dir", true)]);
        let now = Instant::now();

        keys.handle_key(&mut stack, key(KeyCode::Right), now);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.focus(), 1);

        keys.handle_key(&mut stack, key(KeyCode::Left), now);
        assert_eq!(stack.len(), 1);

        keys.handle_key(&mut stack, key(KeyCode::Left), now);
        assert_eq!(stack.len(), 1, "root column stays");
    }

    #[test]
    fn left_on_inner_column_does_nothing() {
        let (mut keys, mut stack) = setup(&[("dir", true)]);
        let now = Instant::now();
        keys.handle_key(&mut stack, key(KeyCode::Right), now);
        stack.set_focus(0);

        assert!(keys.handle_key(&mut stack, key(KeyCode::Left), now).is_empty());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn space_toggles_preview_without_mutation() {
        let (mut keys, mut stack) = setup(&[("dir", true)]);
        let actions = keys.handle_key(&mut stack, key(KeyCode::Char(' ')), Instant::now());

        assert_eq!(actions.as_slice(), &[Action::PreviewToggled("/r/dir".into())]);
        assert_eq!(stack.len(), 1);
        assert_eq!(keys.search_buffer(), "");
    }

    #[test]
    fn slow_second_click_begins_rename() {
        let (mut keys, mut stack) = setup(&[("a", false), ("b", false)]);
        let t0 = Instant::now();

        keys.handle_click(&mut stack, 0, 1, t0);
        let actions = keys.handle_click(&mut stack, 0, 1, t0 + ms(900));

        assert_eq!(actions.as_slice(), &[Action::BeginRename("/r/b".into())]);
    }

    #[test]
    fn click_on_already_selected_entry_arms() {
        let (mut keys, mut stack) = setup(&[("a", false)]);
        let t0 = Instant::now();

        // "a" is auto-selected on load.
        let first = keys.handle_click(&mut stack, 0, 0, t0);
        assert!(!first.iter().any(|a| matches!(a, Action::BeginRename(_))));
        let actions = keys.handle_click(&mut stack, 0, 0, t0 + ms(600));
        assert!(actions.contains(&Action::BeginRename("/r/a".into())));
    }

    #[test]
    fn keystroke_between_clicks_cancels_rename() {
        let (mut keys, mut stack) = setup(&[("a", false), ("b", false)]);
        let t0 = Instant::now();

        keys.handle_click(&mut stack, 0, 1, t0);
        keys.handle_key(&mut stack, key(KeyCode::Esc), t0 + ms(300));
        let actions = keys.handle_click(&mut stack, 0, 1, t0 + ms(900));

        assert!(!actions.iter().any(|a| matches!(a, Action::BeginRename(_))));
    }

    #[test]
    fn double_click_drills() {
        let (mut keys, mut stack) = setup(&[("a", false), ("dir", true)]);
        keys.handle_double_click(&mut stack, 0, 1);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.column(1).unwrap().path(), Path::new("/r/dir"));
    }

    #[test]
    fn click_out_of_range_is_ignored() {
        let (mut keys, mut stack) = setup(&[("a", false)]);
        assert!(keys.handle_click(&mut stack, 4, 0, Instant::now()).is_empty());
        assert!(keys.handle_double_click(&mut stack, 0, 9).is_empty());
    }
}
