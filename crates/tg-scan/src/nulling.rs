use std::collections::HashMap;

use tg_types::{RouteInfo, ScanType};

use crate::config::{ScanConfig, KCBF_BEAM_OFFSET, KCBF_NUM_BEAMS, KCBF_REF_BEAM_IDX};

/// Outcome of sweeping the 64-beam CBF nulling-beam search (`spec.md`
/// §4.F.7): the best candidate beam and the SINR estimate that won it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullingResult {
    pub best_beam: i16,
    pub sinr_approx_db: f32,
}

fn avg((sum, count): (f32, u32)) -> f32 {
    if count == 0 {
        f32::NEG_INFINITY
    } else {
        sum / count as f32
    }
}

/// Selects the nulling beam from a CBF sweep's `routeInfoList`. Each route
/// carries the swept beam in `rx_beam` (the convention this sweep uses for
/// both TX and RX CBF, since the quantity being searched is always "which
/// beam least interferes", reported by the responding radio regardless of
/// which side is nulling) and `packet_idx` distinguishing victim SINR (0)
/// from main-lobe SNR (1).
pub fn select_nulling_beam(
    routes: &[RouteInfo],
    scan_type: ScanType,
    cfg: &ScanConfig,
) -> Option<NullingResult> {
    let mut by_beam: HashMap<i16, [(f32, u32); 2]> = HashMap::new();
    for route in routes {
        if route.packet_idx > 1 {
            continue;
        }
        let entry = by_beam.entry(route.rx_beam).or_default();
        let slot = &mut entry[route.packet_idx as usize];
        slot.0 += route.snr_est;
        slot.1 += 1;
    }

    let ref_beam = KCBF_BEAM_OFFSET + KCBF_REF_BEAM_IDX;
    let ref_entry = *by_beam.get(&ref_beam)?;
    let ref_victim_count = ref_entry[0].1;
    let ref_main_count = ref_entry[1].1;
    let ref_sinr = avg(ref_entry[0]);
    let ref_snr = avg(ref_entry[1]);

    let victim_count_min = ((ref_victim_count as f32 * cfg.cbf_victim_count_scale).max(1.0)).floor() as u32;
    let main_count_min = ((ref_main_count as f32 * cfg.cbf_main_count_scale).max(1.0)).floor() as u32;
    let sinr_thresh = ref_sinr + cfg.cbf_sinr_change_thresh;

    let mut best: Option<NullingResult> = None;
    for offset in 0..KCBF_NUM_BEAMS as i16 {
        let beam = KCBF_BEAM_OFFSET + offset;
        if beam == ref_beam {
            continue;
        }
        let Some(&entry) = by_beam.get(&beam) else {
            continue;
        };
        if entry[0].1 < victim_count_min || entry[1].1 < main_count_min {
            continue;
        }
        let sinr = avg(entry[0]);
        let snr = avg(entry[1]);
        let sinr_approx = if scan_type == ScanType::CbfTx {
            sinr - (ref_snr - snr)
        } else {
            sinr
        };
        if sinr_approx > sinr_thresh && snr > ref_snr + cfg.cbf_snr_change_thresh {
            let better = match best {
                Some(b) => sinr_approx > b.sinr_approx_db,
                None => true,
            };
            if better {
                best = Some(NullingResult { best_beam: beam, sinr_approx_db: sinr_approx });
            }
        }
    }

    match best {
        Some(result) => Some(result),
        None if cfg.scan_cbf_use_ref_beam => Some(NullingResult { best_beam: ref_beam, sinr_approx_db: ref_sinr }),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(beam: i16, packet_idx: u8, snr: f32) -> RouteInfo {
        RouteInfo {
            tx_beam: 0,
            rx_beam: beam,
            snr_est: snr,
            packet_idx,
            sweep_idx: (beam - KCBF_BEAM_OFFSET) as u16,
        }
    }

    #[test]
    fn all_below_threshold_yields_no_apply_unless_ref_beam_fallback() {
        let cfg = ScanConfig::default();
        let ref_beam = KCBF_BEAM_OFFSET;
        let routes = vec![
            route(ref_beam, 0, 10.0),
            route(ref_beam, 1, 10.0),
            route(ref_beam + 1, 0, 10.0),
            route(ref_beam + 1, 1, 10.0),
        ];
        assert!(select_nulling_beam(&routes, ScanType::CbfRx, &cfg).is_none());

        let mut cfg_fallback = cfg.clone();
        cfg_fallback.scan_cbf_use_ref_beam = true;
        let result = select_nulling_beam(&routes, ScanType::CbfRx, &cfg_fallback).unwrap();
        assert_eq!(result.best_beam, ref_beam);
    }

    #[test]
    fn picks_best_beam_above_threshold() {
        let cfg = ScanConfig::default();
        let ref_beam = KCBF_BEAM_OFFSET;
        let mut routes = vec![route(ref_beam, 0, 10.0), route(ref_beam, 1, 10.0)];
        routes.push(route(ref_beam + 1, 0, 15.0));
        routes.push(route(ref_beam + 1, 1, 15.0));
        routes.push(route(ref_beam + 2, 0, 20.0));
        routes.push(route(ref_beam + 2, 1, 20.0));

        let result = select_nulling_beam(&routes, ScanType::CbfRx, &cfg).unwrap();
        assert_eq!(result.best_beam, ref_beam + 2);
    }
}
