use serde::{Deserialize, Serialize};

/// Flags/env defaults from `spec.md` §6, grouped into the one config
/// struct the orchestrator is built with. Every field is independently
/// overridable (mirrors the controller's gflags-style config, minus the
/// CLI parsing itself which stays an external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub scheduled_scans_start_time_offset_s: f64,
    pub scans_start_time_offset_s: f64,
    pub scan_all_responses_timeout_s: f64,
    pub scan_max_distance_m: f64,
    pub scan_max_results: usize,
    pub scan_cbf_use_ref_beam: bool,

    pub cbf_max_tx_pwr: i16,
    pub cbf_target_snr: f32,
    pub cbf_target_inr: f32,
    pub cbf_min_target_sir: f32,
    pub cbf_sinr_change_thresh: f32,
    pub cbf_snr_change_thresh: f32,
    pub cbf_victim_count_scale: f32,
    pub cbf_main_count_scale: f32,
    pub cbf_inr_thresh_nulling: f32,
    pub cbf_inr_thresh_aux_set: f32,
    pub cbf_allow_same_site_aux: bool,

    pub im_scan_timeout_s: f64,
    pub combined_scan_timeout_s: f64,

    pub la_tpc_auto_enabled: bool,
    pub la_tpc_max_mcs_high: u8,
    pub la_tpc_max_mcs_low: u8,
    pub la_tpc_max_mcs_tx_power_min: i16,
    pub la_tpc_max_mcs_tx_power_max: i16,
    pub la_tpc_max_mcs_inr_limit: f32,
    pub la_tpc_max_mcs_inr_alpha: f32,

    pub leap_seconds: i64,
    pub pbf_rtcal_enabled: bool,
    pub cbf_enabled: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scheduled_scans_start_time_offset_s: 15.0,
            scans_start_time_offset_s: 5.0,
            scan_all_responses_timeout_s: 30.0,
            scan_max_distance_m: tg_topology::DEFAULT_SCAN_MAX_DISTANCE_M,
            scan_max_results: 5000,
            scan_cbf_use_ref_beam: false,

            cbf_max_tx_pwr: 21,
            cbf_target_snr: 20.0,
            cbf_target_inr: 10.0,
            cbf_min_target_sir: 3.0,
            cbf_sinr_change_thresh: 0.9,
            cbf_snr_change_thresh: -2.0,
            cbf_victim_count_scale: 0.5,
            cbf_main_count_scale: 0.75,
            cbf_inr_thresh_nulling: 0.0,
            cbf_inr_thresh_aux_set: -10.0,
            cbf_allow_same_site_aux: false,

            im_scan_timeout_s: 60.0,
            combined_scan_timeout_s: 120.0,

            la_tpc_auto_enabled: false,
            la_tpc_max_mcs_high: 12,
            la_tpc_max_mcs_low: 4,
            la_tpc_max_mcs_tx_power_min: 0,
            la_tpc_max_mcs_tx_power_max: 21,
            la_tpc_max_mcs_inr_limit: -10.0,
            la_tpc_max_mcs_inr_alpha: 0.5,

            leap_seconds: tg_time::DEFAULT_LEAP_SECONDS,
            pbf_rtcal_enabled: true,
            cbf_enabled: true,
        }
    }
}

/// `kMcsToSnr`: the SNR (dB) a radio needs to sustain a given MCS index.
/// Indices below the table's lowest key are treated as requiring the
/// lowest listed SNR. Approximates the firmware's MCS/SNR curve closely
/// enough for the max-MCS decrement loop in `spec.md` §4.F.8; exact
/// per-chipset curves live in firmware, out of scope here.
pub fn mcs_to_snr(mcs: u8) -> f32 {
    const TABLE: &[(u8, f32)] = &[
        (1, -5.0),
        (2, -2.5),
        (3, 1.0),
        (4, 3.5),
        (5, 6.5),
        (6, 9.0),
        (7, 11.5),
        (8, 13.5),
        (9, 16.0),
        (10, 18.5),
        (11, 20.5),
        (12, 23.0),
    ];
    TABLE
        .iter()
        .rev()
        .find(|&&(idx, _)| idx <= mcs)
        .map(|&(_, snr)| snr)
        .unwrap_or(TABLE[0].1)
}

pub const KCBF_REF_BEAM_IDX: i16 = 0;
pub const KCBF_NUM_BEAMS: u16 = 152;
pub const KCBF_BEAM_OFFSET: i16 = 64;
