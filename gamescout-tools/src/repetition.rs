//! Click-repetition detection.
//!
//! The model frequently loops on an unresponsive element, clicking the
//! same spot turn after turn. A bounded window of recent click
//! coordinates lets the dispatcher inject a warning into the tool result
//! that breaks the loop.

use std::collections::VecDeque;

/// How many recent clicks are remembered.
const WINDOW: usize = 5;

/// Clicks within this distance of each other count as "near".
const NEAR_RADIUS_PX: f64 = 30.0;

/// How many consecutive near clicks trigger the warning.
const TRIGGER_COUNT: usize = 3;

/// Sliding window of recent click coordinates.
#[derive(Debug, Default)]
pub struct ClickTracker {
    recent: VecDeque<(i64, i64)>,
}

impl ClickTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a click. Returns warning text when the last three clicks
    /// all fall within [`NEAR_RADIUS_PX`] of each other.
    pub fn record(&mut self, x: i64, y: i64) -> Option<String> {
        self.recent.push_back((x, y));
        while self.recent.len() > WINDOW {
            self.recent.pop_front();
        }

        if self.recent.len() < TRIGGER_COUNT {
            return None;
        }

        let last: Vec<(i64, i64)> = self
            .recent
            .iter()
            .rev()
            .take(TRIGGER_COUNT)
            .copied()
            .collect();
        let all_near = last.iter().enumerate().all(|(i, a)| {
            last.iter()
                .skip(i + 1)
                .all(|b| distance(*a, *b) <= NEAR_RADIUS_PX)
        });

        if all_near {
            Some(format!(
                "Warning: you have clicked near these coordinates 3+ times in a row. \
                 The element at ({x}, {y}) may not be interactive, or the click may \
                 not be registering. Try a different element, a different tool, or \
                 inspect the page state with evaluate_js."
            ))
        } else {
            None
        }
    }
}

fn distance(a: (i64, i64), b: (i64, i64)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_warning_below_three_clicks() {
        let mut tracker = ClickTracker::new();
        assert!(tracker.record(500, 400).is_none());
        assert!(tracker.record(510, 395).is_none());
    }

    #[test]
    fn three_near_clicks_warn() {
        let mut tracker = ClickTracker::new();
        tracker.record(500, 400);
        tracker.record(510, 395);
        let warning = tracker.record(500, 402).unwrap();
        assert!(warning.contains("clicked near these coordinates 3+ times"));
    }

    #[test]
    fn scattered_clicks_do_not_warn() {
        let mut tracker = ClickTracker::new();
        tracker.record(100, 100);
        tracker.record(500, 400);
        assert!(tracker.record(110, 105).is_none());
    }

    #[test]
    fn distant_click_resets_the_run() {
        let mut tracker = ClickTracker::new();
        tracker.record(500, 400);
        tracker.record(505, 401);
        tracker.record(900, 100); // breaks the cluster
        assert!(tracker.record(502, 399).is_none());
    }

    #[test]
    fn window_is_bounded() {
        let mut tracker = ClickTracker::new();
        for i in 0..20 {
            tracker.record(i * 100, 0);
        }
        assert!(tracker.recent.len() <= WINDOW);
    }

    #[test]
    fn boundary_distance_counts_as_near() {
        let mut tracker = ClickTracker::new();
        tracker.record(0, 0);
        tracker.record(30, 0); // exactly 30px away
        assert!(tracker.record(15, 0).is_some());
    }
}
