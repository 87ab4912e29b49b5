use tg_types::{BeamRange, PolarityType, RadioMac, ScanMode, ScanType, StartScanRequest, TopologyView};

use crate::error::ScanError;

/// A request that has passed `spec.md` §4.F.2 validation, split by the
/// shape each scan family actually uses. Keeping the three apart avoids a
/// single struct with a dozen `Option`s whose validity depends on which
/// variant is live.
#[derive(Debug, Clone)]
pub enum ValidatedRequest {
    PbfRtcalIm {
        scan_type: ScanType,
        scan_mode: ScanMode,
        sub_type: Option<tg_types::ScanSubType>,
        tx_node: RadioMac,
        rx_nodes: Vec<RadioMac>,
        beams: Option<Vec<BeamRange>>,
        bwgd_len: Option<u32>,
        start_time: f64,
        apply: Option<bool>,
    },
    Cbf {
        scan_type: ScanType,
        main_tx_node: RadioMac,
        main_rx_node: RadioMac,
        aux_tx_nodes: Vec<RadioMac>,
        aux_rx_nodes: Vec<RadioMac>,
        tx_pwr_index: Option<i16>,
        aux_tx_pwr_index: Option<Vec<i16>>,
        null_angle: Option<f32>,
        cbf_beam_idx: Option<i16>,
        apply_bwgd_idx: Option<u64>,
        set_config: bool,
        start_time: f64,
    },
    Topo {
        tx_node: RadioMac,
        start_time: f64,
    },
}

fn require<T>(value: Option<T>, what: &str) -> Result<T, ScanError> {
    value.ok_or_else(|| ScanError::InvalidRequest(format!("{what} required")))
}

fn validate_bwgd_len(len: u32) -> Result<(), ScanError> {
    if !(2..=64).contains(&len) || !len.is_power_of_two() {
        return Err(ScanError::InvalidRequest(format!(
            "bwgdLen {len} must be a power of two in [2, 64]"
        )));
    }
    Ok(())
}

fn validate_beams(beams: &[BeamRange], expected_len: usize) -> Result<(), ScanError> {
    if beams.len() != expected_len {
        return Err(ScanError::InvalidRequest(format!(
            "expected {expected_len} beam ranges, got {}",
            beams.len()
        )));
    }
    for b in beams {
        if !b.is_valid() {
            return Err(ScanError::InvalidRequest(format!(
                "invalid beam range [{}, {}]",
                b.low, b.high
            )));
        }
    }
    Ok(())
}

/// Validates a `StartScan` request against `spec.md` §4.F.2. `topo` is
/// consulted for the TOPO/RTCAL polarity checks; pass `None` when no
/// topology is wired up (validation of the other fields still runs).
pub fn validate(
    req: &StartScanRequest,
    topo: Option<&dyn TopologyView>,
) -> Result<ValidatedRequest, ScanError> {
    let scan_type = require(req.scan_type, "scanType")?;
    let start_time = req.start_time.unwrap_or(tg_time::unix_now_secs());

    match scan_type {
        ScanType::Pbf | ScanType::Rtcal | ScanType::Im | ScanType::TestUpdAwv => {
            let tx_present = req.tx_node.is_some();
            let rx_present = req.rx_nodes.is_some();
            if tx_present != rx_present {
                return Err(ScanError::InvalidRequest(
                    "txNode and rxNodes must be jointly present or jointly absent".into(),
                ));
            }
            let tx_node = require(req.tx_node, "txNode")?;
            let rx_nodes = require(req.rx_nodes.clone(), "rxNodes")?;
            if rx_nodes.is_empty() {
                return Err(ScanError::InvalidRequest("rxNodes must not be empty".into()));
            }

            if let Some(beams) = &req.beams {
                validate_beams(beams, 1 + rx_nodes.len())?;
            }

            let scan_mode = require(req.scan_mode, "scanMode")?;
            if scan_type == ScanType::Rtcal {
                if !matches!(scan_mode, ScanMode::Selective | ScanMode::Relative) {
                    return Err(ScanError::InvalidRequest(
                        "RTCAL requires scanMode SELECTIVE or RELATIVE".into(),
                    ));
                }
                require(req.bwgd_len, "bwgdLen")?;
                if let Some(topo) = topo {
                    if scan_mode == ScanMode::Selective
                        && topo.radio_polarity(&tx_node) == Some(PolarityType::Hybrid)
                    {
                        return Err(ScanError::InvalidRequest(
                            "RTCAL selective scan rejected on HYBRID polarity".into(),
                        ));
                    }
                }
            }
            if let Some(len) = req.bwgd_len {
                validate_bwgd_len(len)?;
            }

            Ok(ValidatedRequest::PbfRtcalIm {
                scan_type,
                scan_mode,
                sub_type: req.sub_type,
                tx_node,
                rx_nodes,
                beams: req.beams.clone(),
                bwgd_len: req.bwgd_len,
                start_time,
                apply: req.apply,
            })
        }

        ScanType::CbfTx | ScanType::CbfRx => {
            let main_tx_node = require(req.main_tx_node, "mainTxNode")?;
            let main_rx_node = require(req.main_rx_node, "mainRxNode")?;
            let aux_tx_nodes = require(req.aux_tx_nodes.clone(), "auxTxNodes")?;
            let aux_rx_nodes = require(req.aux_rx_nodes.clone(), "auxRxNodes")?;
            if aux_tx_nodes.len() != aux_rx_nodes.len() {
                return Err(ScanError::InvalidRequest(
                    "auxTxNodes and auxRxNodes must have equal length".into(),
                ));
            }
            if let Some(aux_pwr) = &req.aux_tx_pwr_index {
                if aux_pwr.len() != aux_tx_nodes.len() {
                    return Err(ScanError::InvalidRequest(
                        "auxTxPwrIndex must match auxTxNodes length".into(),
                    ));
                }
                if req.tx_pwr_index.is_none() {
                    return Err(ScanError::InvalidRequest(
                        "auxTxPwrIndex requires txPwrIndex".into(),
                    ));
                }
            }

            Ok(ValidatedRequest::Cbf {
                scan_type,
                main_tx_node,
                main_rx_node,
                aux_tx_nodes,
                aux_rx_nodes,
                tx_pwr_index: req.tx_pwr_index,
                aux_tx_pwr_index: req.aux_tx_pwr_index.clone(),
                null_angle: req.null_angle,
                cbf_beam_idx: req.cbf_beam_idx,
                apply_bwgd_idx: req.apply_bwgd_idx,
                set_config: req.set_config.unwrap_or(false),
                start_time,
            })
        }

        ScanType::Topo => {
            let tx_node = require(req.tx_node, "txNode")?;
            if let Some(topo) = topo {
                if topo.radio_polarity(&tx_node) == Some(PolarityType::Hybrid) {
                    return Err(ScanError::InvalidRequest(
                        "topology scan rejected on HYBRID polarity".into(),
                    ));
                }
            }
            Ok(ValidatedRequest::Topo { tx_node, start_time })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(l: &str) -> RadioMac {
        RadioMac::test_mac(l)
    }

    #[test]
    fn im_scan_with_empty_rx_set_rejected() {
        let req = StartScanRequest {
            scan_type: Some(ScanType::Im),
            scan_mode: Some(ScanMode::Fine),
            tx_node: Some(mac("AA")),
            rx_nodes: Some(vec![]),
            ..Default::default()
        };
        assert!(validate(&req, None).is_err());
    }

    #[test]
    fn bwgd_len_boundaries() {
        assert!(validate_bwgd_len(1).is_err());
        assert!(validate_bwgd_len(2).is_ok());
        assert!(validate_bwgd_len(3).is_err());
        assert!(validate_bwgd_len(64).is_ok());
        assert!(validate_bwgd_len(128).is_err());
    }

    #[test]
    fn beam_range_low_high_order() {
        assert!(BeamRange { low: 0, high: 255 }.is_valid());
        assert!(!BeamRange { low: 255, high: 0 }.is_valid());
    }

    #[test]
    fn rtcal_requires_selective_or_relative_and_bwgd_len() {
        let req = StartScanRequest {
            scan_type: Some(ScanType::Rtcal),
            scan_mode: Some(ScanMode::Coarse),
            tx_node: Some(mac("AA")),
            rx_nodes: Some(vec![mac("BB")]),
            bwgd_len: Some(4),
            ..Default::default()
        };
        assert!(validate(&req, None).is_err());

        let req_ok = StartScanRequest {
            scan_mode: Some(ScanMode::Selective),
            ..req
        };
        assert!(validate(&req_ok, None).is_ok());
    }

    #[test]
    fn cbf_requires_matching_aux_cardinalities() {
        let req = StartScanRequest {
            scan_type: Some(ScanType::CbfRx),
            main_tx_node: Some(mac("AA")),
            main_rx_node: Some(mac("BB")),
            aux_tx_nodes: Some(vec![mac("CC")]),
            aux_rx_nodes: Some(vec![mac("DD"), mac("EE")]),
            ..Default::default()
        };
        assert!(validate(&req, None).is_err());
    }
}
