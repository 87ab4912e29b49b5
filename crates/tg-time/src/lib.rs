//! GPS-time approximation and BWGD (BandWidth Grant Duration) conversions.
//!
//! A [`GpsClock`] anchors a GPS epoch value to a monotonic [`Instant`] the
//! moment [`GpsClock::set_epoch`] is called, then derives `now()` by adding
//! elapsed steady time to that epoch. This mirrors the controller/minion's
//! `GpsClock`: GPS time is never read from a free-running OS clock, since
//! that clock can jump; it is read from a steady clock offset by the last
//! known-good GPS fix.

use std::sync::RwLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds between the Unix epoch (1970-01-01T00:00:00Z) and the GPS epoch
/// (1980-01-06T00:00:00Z), ignoring leap seconds (Unix time doesn't count
/// them either, so the two offsets cancel here).
pub const GPS_EPOCH_UNIX_OFFSET_SECS: i64 = 315_964_800;

/// Default number of leap seconds GPS time is currently ahead of UTC.
pub const DEFAULT_LEAP_SECONDS: i64 = 18;

/// Duration of a single BWGD slot.
pub const BWGD_DURATION: Duration = Duration::from_millis(25) .checked_add(Duration::from_micros(600)).unwrap();

/// A BandWidth Grant Duration index: a count of 25.6ms slots since the GPS
/// epoch. `BwgdIndex(n)` covers `[n * 25.6ms, (n+1) * 25.6ms)`.
pub type BwgdIndex = u64;

/// Approximation of GPS time, anchored to a steady clock.
///
/// Before [`GpsClock::set_epoch`] is ever called, [`GpsClock::now`] returns
/// `Duration::ZERO`; callers must treat that as "GPS uninitialized" per the
/// spec, never as a legitimate timestamp.
#[derive(Debug)]
pub struct GpsClock {
    inner: RwLock<Anchor>,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    epoch: Duration,
    updated_at: Instant,
}

impl Default for GpsClock {
    fn default() -> Self {
        Self::new()
    }
}

impl GpsClock {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Anchor {
                epoch: Duration::ZERO,
                updated_at: Instant::now(),
            }),
        }
    }

    /// Update the anchor. Call this whenever a fresh GPS fix arrives.
    pub fn set_epoch(&self, epoch: Duration) {
        let mut guard = self.inner.write().unwrap();
        guard.epoch = epoch;
        guard.updated_at = Instant::now();
        tracing::debug!(epoch_secs = epoch.as_secs(), "gps clock epoch updated");
    }

    /// Current GPS time since the GPS epoch, or `Duration::ZERO` if
    /// [`set_epoch`](Self::set_epoch) has never been called.
    pub fn now(&self) -> Duration {
        let guard = self.inner.read().unwrap();
        if guard.epoch.is_zero() {
            return Duration::ZERO;
        }
        guard.epoch + guard.updated_at.elapsed()
    }

    /// Whether the clock has ever had an epoch set.
    pub fn is_initialized(&self) -> bool {
        !self.inner.read().unwrap().epoch.is_zero()
    }

    /// Seconds since the GPS epoch for the given GPS time point.
    pub fn to_time_t(t: Duration) -> i64 {
        t.as_secs() as i64
    }
}

/// Convert a count of seconds since the GPS epoch to a [`BwgdIndex`].
///
/// `bwgd = ceil(gps_seconds * 10000 / 256)`, per the wire-level definition
/// used by radio firmware; fractional BWGDs always round up so that a
/// command scheduled "now" never lands in a slot that has already begun.
pub fn gps_seconds_to_bwgd(gps_seconds: f64) -> BwgdIndex {
    let raw = gps_seconds * 10000.0 / 256.0;
    raw.ceil().max(0.0) as BwgdIndex
}

/// Convert a [`BwgdIndex`] back to seconds since the GPS epoch.
pub fn bwgd_to_gps_seconds(bwgd: BwgdIndex) -> f64 {
    bwgd as f64 * 256.0 / 10000.0
}

/// Convert a Unix timestamp (seconds since 1970-01-01T00:00:00Z) to a
/// [`BwgdIndex`], given the leap-second count currently separating UTC from
/// GPS time.
pub fn unix_time_to_bwgd(unix_secs: f64, leap_seconds: i64) -> BwgdIndex {
    let gps_seconds = unix_secs - GPS_EPOCH_UNIX_OFFSET_SECS as f64 + leap_seconds as f64;
    gps_seconds_to_bwgd(gps_seconds)
}

/// Convert a [`BwgdIndex`] to a Unix timestamp (seconds since
/// 1970-01-01T00:00:00Z), given the leap-second count currently separating
/// UTC from GPS time.
pub fn bwgd_to_unix_time(bwgd: BwgdIndex, leap_seconds: i64) -> f64 {
    let gps_seconds = bwgd_to_gps_seconds(bwgd);
    gps_seconds + GPS_EPOCH_UNIX_OFFSET_SECS as f64 - leap_seconds as f64
}

/// Convenience: the current Unix time, as used when no `GpsClock` is
/// available (e.g. minion has never synced and must fall back to wall
/// clock for logging purposes only — never for BWGD scheduling math).
pub fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_clock_reads_zero() {
        let clock = GpsClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        assert!(!clock.is_initialized());
    }

    #[test]
    fn set_epoch_then_now_advances_monotonically() {
        let clock = GpsClock::new();
        clock.set_epoch(Duration::from_secs(1_000_000));
        let t0 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t1 = clock.now();
        assert!(t1 > t0);
        assert!(clock.is_initialized());
    }

    #[test]
    fn bwgd_round_trip_within_one_slot() {
        // Invariant 4: bwgd_to_unix_time(unix_time_to_bwgd(t)) is within one
        // BWGD (25.6ms) of t.
        let t = 1_700_000_000.0_f64;
        let bwgd = unix_time_to_bwgd(t, DEFAULT_LEAP_SECONDS);
        let back = bwgd_to_unix_time(bwgd, DEFAULT_LEAP_SECONDS);
        assert!((back - t).abs() <= BWGD_DURATION.as_secs_f64() + 1e-9);
    }

    #[test]
    fn bwgd_duration_is_25_6_ms() {
        assert_eq!(BWGD_DURATION, Duration::from_micros(25_600));
    }

    #[test]
    fn gps_seconds_round_trip() {
        for bwgd in [0u64, 1, 128, 1_000_000, 66_328_125_078] {
            let secs = bwgd_to_gps_seconds(bwgd);
            let back = gps_seconds_to_bwgd(secs);
            assert_eq!(back, bwgd);
        }
    }
}
