//! Duration to integer conversions for log fields.
//!
//! `Duration::as_millis` is a `u128`; these clamp instead of truncating.

use std::time::Duration;

#[inline]
#[must_use]
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_durations_convert_exactly() {
        assert_eq!(saturating_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(saturating_micros(Duration::from_millis(2)), 2_000);
    }

    #[test]
    fn huge_durations_clamp() {
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
        assert_eq!(saturating_micros(Duration::MAX), u64::MAX);
        // Representable as a Duration, not as u64 microseconds.
        let wrapping = Duration::from_secs(u64::MAX / 1_000 + 1);
        assert_eq!(saturating_micros(wrapping), u64::MAX);
    }
}
