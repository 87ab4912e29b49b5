//! Reachability metric (`spec.md` §6, `SPEC_FULL.md` §11): a sliding window
//! of status-report ack rate. Ported from `StatusApp::AckMetricData` — a
//! fixed-size deque of "was this report acked yet" slots, oldest at the
//! back, pushed/popped every report-interval tick.

use std::collections::VecDeque;
use std::time::Duration;

/// ~5 minute window, matching `kStatusReportAckMetricWindow`.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub struct Reachability {
    window: VecDeque<bool>,
    acked_count: usize,
    capacity: usize,
}

impl Reachability {
    pub fn new(window: Duration, status_report_interval: Duration) -> Self {
        let capacity = ((window.as_secs_f64() / status_report_interval.as_secs_f64()).floor() as usize).max(1);
        Self { window: VecDeque::with_capacity(capacity), acked_count: 0, capacity }
    }

    /// Call once per status report sent.
    pub fn record_request(&mut self) {
        if self.window.len() == self.capacity {
            if self.window.pop_back() == Some(true) {
                self.acked_count -= 1;
            }
        }
        self.window.push_front(false);
    }

    /// Call when the controller acks the most recent report. Returns
    /// `false` if the front slot was already acked (a duplicate ack) or
    /// there is nothing outstanding.
    pub fn record_response(&mut self) -> bool {
        match self.window.front_mut() {
            Some(slot) if !*slot => {
                *slot = true;
                self.acked_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Fraction of the window's reports that were acked, or `None` before
    /// the first report is sent.
    pub fn ack_rate(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.acked_count as f64 / self.window.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_requests_yet_has_no_rate() {
        let r = Reachability::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(r.ack_rate(), None);
    }

    #[test]
    fn every_request_acked_is_full_rate() {
        let mut r = Reachability::new(Duration::from_secs(3), Duration::from_secs(1));
        for _ in 0..3 {
            r.record_request();
            assert!(r.record_response());
        }
        assert_eq!(r.ack_rate(), Some(1.0));
    }

    #[test]
    fn unacked_requests_drag_the_rate_down() {
        let mut r = Reachability::new(Duration::from_secs(2), Duration::from_secs(1));
        r.record_request();
        r.record_response();
        r.record_request(); // never acked
        assert_eq!(r.ack_rate(), Some(0.5));
    }

    #[test]
    fn window_slides_and_drops_oldest_slot() {
        let mut r = Reachability::new(Duration::from_secs(2), Duration::from_secs(1));
        r.record_request();
        r.record_response();
        r.record_request(); // not acked, will be evicted next
        r.record_request(); // evicts the first (acked) slot
        assert_eq!(r.ack_rate(), Some(0.0));
    }

    #[test]
    fn duplicate_ack_is_a_no_op() {
        let mut r = Reachability::new(Duration::from_secs(2), Duration::from_secs(1));
        r.record_request();
        assert!(r.record_response());
        assert!(!r.record_response());
        assert_eq!(r.ack_rate(), Some(1.0));
    }
}
