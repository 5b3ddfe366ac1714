//! Smoothed overhead-per-minute rate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum simulated time between two rate samples.
pub const OPM_WINDOW: Duration = Duration::from_secs(6);

/// Tracks a module's production rate. The rate is resampled at most once per
/// [`OPM_WINDOW`] and holds its last value in between.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpmTracker {
    since_sample: Duration,
    snapshot: f64,
    current: f64,
}

impl OpmTracker {
    /// Account for `dt` of simulated time with the module now at `value`.
    pub fn observe(&mut self, dt: Duration, value: f64) {
        self.since_sample += dt;
        if self.since_sample < OPM_WINDOW {
            return;
        }
        let minutes = self.since_sample.as_secs_f64() / 60.0;
        self.current = (value - self.snapshot) / minutes;
        self.snapshot = value;
        self.since_sample = Duration::ZERO;
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_until_window_elapses() {
        let mut t = OpmTracker::default();
        t.observe(Duration::from_secs(3), 100.0);
        assert_eq!(t.current(), 0.0);
        t.observe(Duration::from_secs(3), 100.0);
        // 100 overhead over 6 s = 1000 per minute
        assert!((t.current() - 1000.0).abs() < 1e-9);
        t.observe(Duration::from_secs(1), 500.0);
        assert!((t.current() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn resamples_from_last_snapshot() {
        let mut t = OpmTracker::default();
        t.observe(Duration::from_secs(6), 60.0);
        t.observe(Duration::from_secs(6), 60.0);
        assert_eq!(t.current(), 0.0);
    }
}
