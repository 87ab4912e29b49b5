use std::time::{Duration, Instant};

/// BWGD range a `curSuperframeNum`-derived timestamp must fall in to be
/// considered sane (roughly the 2020s-2040s), per `spec.md` §4.F.9.
const SANE_BWGD_MIN: f64 = 4.7e10;
const SANE_BWGD_MAX: f64 = 7.7e10;

/// Throttles the time-skew warning to at most once per hour.
#[derive(Debug)]
pub struct SkewWatchdog {
    last_warned: Option<Instant>,
    throttle: Duration,
}

impl Default for SkewWatchdog {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl SkewWatchdog {
    pub fn new(throttle: Duration) -> Self {
        Self {
            last_warned: None,
            throttle,
        }
    }

    /// Checks a response's `cur_superframe_num` against the controller's
    /// own clock. `superframe_num / 16` is the responder's inferred BWGD
    /// (16 superframes per BWGD). Emits a throttled warning when the
    /// responder's BWGD is in the sane range and its wall-clock skew from
    /// the controller exceeds `scans_start_time_offset`.
    pub fn check(
        &mut self,
        cur_superframe_num: u64,
        controller_bwgd: u64,
        leap_seconds: i64,
        scans_start_time_offset_s: f64,
        now: Instant,
    ) {
        let responder_bwgd = cur_superframe_num / 16;
        let responder_bwgd_f = responder_bwgd as f64;
        if !(SANE_BWGD_MIN..=SANE_BWGD_MAX).contains(&responder_bwgd_f) {
            return;
        }
        let responder_time = tg_time::bwgd_to_unix_time(responder_bwgd, leap_seconds);
        let controller_time = tg_time::bwgd_to_unix_time(controller_bwgd, leap_seconds);
        let skew = (responder_time - controller_time).abs();
        if skew <= scans_start_time_offset_s {
            return;
        }
        if let Some(last) = self.last_warned {
            if now.duration_since(last) < self.throttle {
                return;
            }
        }
        self.last_warned = Some(now);
        tracing::warn!(
            responder_bwgd,
            controller_bwgd,
            skew_s = skew,
            "responder/controller time skew exceeds scan setup offset"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_out_of_range_superframe() {
        let mut wd = SkewWatchdog::default();
        // superframe_num / 16 far below the sane BWGD band.
        wd.check(16, 66_000_000_000, 18, 5.0, Instant::now());
        assert!(wd.last_warned.is_none());
    }

    #[test]
    fn throttles_repeated_warnings() {
        let mut wd = SkewWatchdog::new(Duration::from_secs(10));
        let responder_bwgd = 66_000_000_000u64;
        let controller_bwgd = responder_bwgd + 1_000_000; // large skew
        let superframe = responder_bwgd * 16;
        let t0 = Instant::now();
        wd.check(superframe, controller_bwgd, 18, 5.0, t0);
        assert!(wd.last_warned.is_some());
        let first_warn = wd.last_warned;
        wd.check(superframe, controller_bwgd, 18, 5.0, t0 + Duration::from_secs(1));
        assert_eq!(wd.last_warned, first_warn);
    }
}
