//!  src/util/type_select.rs
//!  ===================================================================
//!  Type-to-select buffer
//!
//!  Printable keys accumulate into a search string. A gap longer than the
//!  timeout starts a fresh buffer. Time is passed in by the caller so the
//!  behaviour is deterministic under test.

use compact_str::CompactString;
use std::time::{Duration, Instant};
use tracing::trace;

/* ======================== TypeSelectBuffer ========================== */

#[derive(Debug, Clone, Default)]
pub struct TypeSelectBuffer {
    buffer: CompactString,
    last: Option<Instant>,
}

impl TypeSelectBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `ch` and returns the current buffer.
    pub fn push(&mut self, ch: char, now: Instant, timeout: Duration) -> &str {
        let expired = self
            .last
            .is_some_and(|prev| now.saturating_duration_since(prev) > timeout);

        if expired {
            trace!(
                marker = "TYPE_SELECT_RESET",
                operation_type = "type_select",
                discarded = %self.buffer,
                "buffer timed out"
            );
            self.buffer.clear();
        }

        self.buffer.push(ch);
        self.last = Some(now);
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last = None;
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    #[test]
    fn keys_within_timeout_accumulate() {
        let t0 = Instant::now();
        let mut buffer = TypeSelectBuffer::new();

        assert_eq!(buffer.push('a', t0, TIMEOUT), "a");
        assert_eq!(buffer.push('v', t0 + Duration::from_millis(400), TIMEOUT), "av");
        assert_eq!(buffer.push('o', t0 + Duration::from_millis(1400), TIMEOUT), "avo");
    }

    #[test]
    fn gap_over_timeout_restarts() {
        let t0 = Instant::now();
        let mut buffer = TypeSelectBuffer::new();

        buffer.push('a', t0, TIMEOUT);
        assert_eq!(buffer.push('b', t0 + Duration::from_millis(1001), TIMEOUT), "b");
    }

    #[test]
    fn reset_clears() {
        let mut buffer = TypeSelectBuffer::new();
        buffer.push('x', Instant::now(), TIMEOUT);
        buffer.reset();
        assert!(buffer.is_empty());
    }
}
