//! src/model/history.rs
//! ============================================================================
//! # NavigationHistory: back/forward over visited roots
//!
//! A linear log with a cursor. Recording while the cursor is not at the end
//! discards the forward entries. `back`/`forward` only move the cursor; the
//! caller re-applies the returned root without recording it again.

use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<PathBuf>,
    cursor: Option<usize>,
}

impl NavigationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a visit to `path`. Re-recording the current location is a
    /// no-op.
    pub fn record_navigation(&mut self, path: PathBuf) -> bool {
        match self.cursor {
            None => {
                self.entries.clear();
                self.entries.push(path);
                self.cursor = Some(0);
            }
            Some(cursor) => {
                if self.entries[cursor] == path {
                    return false;
                }

                let dropped = self.entries.len() - (cursor + 1);
                self.entries.truncate(cursor + 1);
                self.entries.push(path);
                self.cursor = Some(cursor + 1);

                if dropped > 0 {
                    debug!(
                        marker = "HISTORY_BRANCH",
                        operation_type = "navigation_history",
                        dropped,
                        "forward history discarded"
                    );
                }
            }
        }
        true
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Steps back and returns the location to show.
    ///
    /// Calling this when [`can_go_back`](Self::can_go_back) is false is a
    /// caller bug: it panics in debug builds and returns `None` otherwise.
    pub fn back(&mut self) -> Option<PathBuf> {
        debug_assert!(self.can_go_back(), "back() called with nothing behind the cursor");
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        Some(self.entries[cursor].clone())
    }

    /// Steps forward and returns the location to show. Same contract as
    /// [`back`](Self::back).
    pub fn forward(&mut self) -> Option<PathBuf> {
        debug_assert!(self.can_go_forward(), "forward() called at the newest entry");
        let cursor = self.cursor.filter(|&c| c + 1 < self.entries.len())? + 1;
        self.cursor = Some(cursor);
        Some(self.entries[cursor].clone())
    }

    #[must_use]
    pub fn current(&self) -> Option<&Path> {
        self.cursor.map(|c| self.entries[c].as_path())
    }

    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn first_navigation_seeds_history() {
        let mut history = NavigationHistory::new();
        assert!(history.record_navigation(p("/a")));

        assert_eq!(history.entries(), &[p("/a")]);
        assert_eq!(history.current(), Some(Path::new("/a")));
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
    }

    #[test]
    fn same_path_is_not_recorded_twice() {
        let mut history = NavigationHistory::new();
        history.record_navigation(p("/a"));
        assert!(!history.record_navigation(p("/a")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn back_forward_then_branch() {
        let mut history = NavigationHistory::new();
        history.record_navigation(p("/a"));
        history.record_navigation(p("/b"));

        assert_eq!(history.back(), Some(p("/a")));
        assert!(history.can_go_forward());

        assert_eq!(history.forward(), Some(p("/b")));

        history.back();
        history.record_navigation(p("/c"));
        assert!(!history.can_go_forward());
        assert_eq!(history.entries(), &[p("/a"), p("/c")]);
    }

    #[test]
    fn back_does_not_record() {
        let mut history = NavigationHistory::new();
        history.record_navigation(p("/a"));
        history.record_navigation(p("/b"));
        history.back();

        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some(Path::new("/a")));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nothing behind the cursor")]
    fn back_on_empty_history_asserts() {
        NavigationHistory::new().back();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "newest entry")]
    fn forward_at_tail_asserts() {
        let mut history = NavigationHistory::new();
        history.record_navigation(p("/a"));
        history.forward();
    }
}
