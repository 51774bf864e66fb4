//!  src/util/click_timer.rs
//!  ===================================================================
//!  Slow second click detection for inline rename
//!
//!  A click on an entry arms the timer. A later click on the same entry
//!  inside `[min, max]` starts a rename. Faster is a double click and
//!  disarms; slower simply re-arms. Any key or a click elsewhere
//!  invalidates the pending rename.

use std::time::Instant;
use tracing::debug;

use crate::config::KeyTiming;
use crate::util::elapsed::saturating_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    column: usize,
    entry: usize,
    at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct RenameClickTimer {
    armed: Option<Armed>,
}

impl RenameClickTimer {
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Feeds a click on an entry that was already selected before the click.
    /// Returns true when the click should start a rename.
    pub fn click(&mut self, column: usize, entry: usize, now: Instant, timing: &KeyTiming) -> bool {
        let previous = self.armed.take();

        let Some(armed) = previous.filter(|a| a.column == column && a.entry == entry) else {
            self.arm(column, entry, now);
            return false;
        };

        let elapsed = now.saturating_duration_since(armed.at);
        if elapsed < timing.rename_click_min {
            // Double click territory.
            return false;
        }

        if elapsed > timing.rename_click_max {
            self.arm(column, entry, now);
            return false;
        }

        debug!(
            marker = "RENAME_CLICK",
            operation_type = "click_timer",
            column,
            entry,
            elapsed_ms = saturating_millis(elapsed),
            "slow second click"
        );
        true
    }

    /// Arms the timer for a click that selected `entry`.
    pub fn arm(&mut self, column: usize, entry: usize, now: Instant) {
        self.armed = Some(Armed { column, entry, at: now });
    }

    pub fn invalidate(&mut self) {
        self.armed = None;
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn second_click_inside_window_renames() {
        let timing = KeyTiming::default();
        let t0 = Instant::now();
        let mut timer = RenameClickTimer::new();

        assert!(!timer.click(0, 2, t0, &timing));
        assert!(timer.click(0, 2, t0 + ms(800), &timing));
        assert!(!timer.is_armed());
    }

    #[test]
    fn fast_click_is_not_a_rename() {
        let timing = KeyTiming::default();
        let t0 = Instant::now();
        let mut timer = RenameClickTimer::new();

        timer.click(0, 2, t0, &timing);
        assert!(!timer.click(0, 2, t0 + ms(200), &timing));
        assert!(!timer.click(0, 2, t0 + ms(900), &timing));
    }

    #[test]
    fn late_click_rearms() {
        let timing = KeyTiming::default();
        let t0 = Instant::now();
        let mut timer = RenameClickTimer::new();

        timer.click(0, 2, t0, &timing);
        assert!(!timer.click(0, 2, t0 + ms(2500), &timing));
        assert!(timer.click(0, 2, t0 + ms(3200), &timing));
    }

    #[test]
    fn other_entry_or_invalidate_cancels() {
        let timing = KeyTiming::default();
        let t0 = Instant::now();
        let mut timer = RenameClickTimer::new();

        timer.click(0, 2, t0, &timing);
        assert!(!timer.click(0, 3, t0 + ms(700), &timing));
        assert!(!timer.click(0, 2, t0 + ms(1400), &timing));

        timer.invalidate();
        assert!(!timer.click(0, 2, t0 + ms(2000), &timing));
    }
}
