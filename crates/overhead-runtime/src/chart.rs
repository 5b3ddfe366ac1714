//! Bounded series of output deltas for the progress chart.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// One chart sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Simulated wall time as `hh:mm`.
    pub label: String,
    /// Output gained since the previous sample.
    pub delta: f64,
}

/// `hh:mm` label for a simulated clock reading. Wraps after 24 hours.
///
/// Example:
/// assert_eq!(clock_label(Duration::from_secs(3_660)), "01:01");
pub fn clock_label(clock: Duration) -> String {
    let secs = (clock.as_secs() % SECONDS_PER_DAY) as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN);
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Ring of the last `max_points` samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaSeries {
    points: VecDeque<ChartPoint>,
    max_points: usize,
    last_value: f64,
}

impl DeltaSeries {
    pub fn new(max_points: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(max_points),
            max_points,
            last_value: 0.0,
        }
    }

    /// Record the output `value` observed at `clock`.
    pub fn sample(&mut self, clock: Duration, value: f64) {
        let delta = (value - self.last_value).max(0.0);
        self.last_value = value;
        if self.max_points == 0 {
            return;
        }
        if self.points.len() == self.max_points {
            self.points.pop_front();
        }
        self.points.push_back(ChartPoint {
            label: clock_label(clock),
            delta,
        });
    }

    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn labels_follow_the_simulated_clock() {
        assert_eq!(clock_label(Duration::ZERO), "00:00");
        assert_eq!(clock_label(Duration::from_secs(59)), "00:00");
        assert_eq!(clock_label(Duration::from_secs(3_660)), "01:01");
        assert_eq!(clock_label(Duration::from_secs(SECONDS_PER_DAY + 120)), "00:02");
    }

    #[test]
    fn deltas_are_differences_between_samples() {
        let mut s = DeltaSeries::new(30);
        s.sample(Duration::from_secs(10), 50.0);
        s.sample(Duration::from_secs(20), 80.0);
        let deltas: Vec<f64> = s.points().map(|p| p.delta).collect();
        assert_eq!(deltas, vec![50.0, 30.0]);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(cap in 0usize..40, n in 0usize..100) {
            let mut s = DeltaSeries::new(cap);
            for i in 0..n {
                s.sample(Duration::from_secs(i as u64 * 10), i as f64);
            }
            prop_assert_eq!(s.len(), n.min(cap));
        }
    }
}
