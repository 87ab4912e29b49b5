//! Continuous topology scan (`spec.md` §4.I): a per-radio loop that emits a
//! TOPO scan every `bwgdDelta` BWGDs for `durationSec` seconds. Modeled as a
//! pure schedule object the owning loop ticks with its current BWGD; a new
//! request for the same radio simply replaces the old [`ContinuousTopoScan`]
//! value, which is what "a new request cancels the prior loop" means here.

use tg_time::BWGD_DURATION;

/// Firmware version whose TOPO sweep count differs from the default.
const TOPO_NUM_SWEEP_SPECIAL_FW: &str = "10.11.0.28";

/// `bwgdDelta = 11 + ibfNumberOfBeams^2 * topoNumSweep / 64` (`spec.md` §4.I).
pub fn bwgd_delta(ibf_number_of_beams: u32, firmware_version: &str) -> u64 {
    let topo_num_sweep: u64 = if firmware_version == TOPO_NUM_SWEEP_SPECIAL_FW { 4 } else { 7 };
    11 + (ibf_number_of_beams as u64).pow(2) * topo_num_sweep / 64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopoScanAction {
    /// Emit a TOPO scan now; the next one is scheduled `bwgdDelta` later.
    Emit,
    /// The current time is already past the scheduled BWGD: the schedule
    /// was reset and an error should be logged.
    OverrunReset,
    /// Nothing to do yet.
    Idle,
}

#[derive(Debug, Clone)]
pub struct ContinuousTopoScan {
    delta_bwgd: u64,
    end_bwgd: u64,
    next_bwgd: u64,
}

impl ContinuousTopoScan {
    pub fn start(start_bwgd: u64, duration_sec: f64, delta_bwgd: u64) -> Self {
        let bwgds_per_sec = 1.0 / BWGD_DURATION.as_secs_f64();
        let span_bwgd = (duration_sec * bwgds_per_sec).round() as u64;
        Self {
            delta_bwgd: delta_bwgd.max(1),
            end_bwgd: start_bwgd + span_bwgd,
            next_bwgd: start_bwgd,
        }
    }

    /// Advances the schedule by one tick at the given current BWGD.
    pub fn tick(&mut self, now_bwgd: u64) -> TopoScanAction {
        if self.is_done() {
            return TopoScanAction::Idle;
        }
        if now_bwgd > self.next_bwgd {
            tracing::error!(now_bwgd, scheduled = self.next_bwgd, "continuous topo scan overrun, resetting schedule");
            self.next_bwgd = now_bwgd + self.delta_bwgd;
            return TopoScanAction::OverrunReset;
        }
        if now_bwgd == self.next_bwgd {
            self.next_bwgd += self.delta_bwgd;
            return TopoScanAction::Emit;
        }
        TopoScanAction::Idle
    }

    pub fn is_done(&self) -> bool {
        self.next_bwgd > self.end_bwgd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bwgd_delta_default_firmware_uses_topo_num_sweep_seven() {
        assert_eq!(bwgd_delta(8, "10.11.0.99"), 11 + 64 * 7 / 64);
    }

    #[test]
    fn bwgd_delta_special_firmware_uses_topo_num_sweep_four() {
        assert_eq!(bwgd_delta(8, "10.11.0.28"), 11 + 64 * 4 / 64);
    }

    #[test]
    fn tick_emits_exactly_on_schedule_then_advances() {
        let mut scan = ContinuousTopoScan::start(0, 1.0, 10);
        assert_eq!(scan.tick(0), TopoScanAction::Emit);
        assert_eq!(scan.tick(5), TopoScanAction::Idle);
        assert_eq!(scan.tick(10), TopoScanAction::Emit);
    }

    #[test]
    fn overrun_resets_schedule_relative_to_now() {
        let mut scan = ContinuousTopoScan::start(0, 1.0, 10);
        scan.tick(0);
        assert_eq!(scan.tick(25), TopoScanAction::OverrunReset);
    }

    #[test]
    fn loop_stops_after_its_duration_elapses() {
        let mut scan = ContinuousTopoScan::start(0, 0.0, 10);
        assert!(scan.is_done());
        assert_eq!(scan.tick(0), TopoScanAction::Idle);
    }
}
