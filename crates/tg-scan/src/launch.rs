use std::collections::HashMap;

use tg_slotsched::SlotSchedulerHandle;
use tg_types::{
    BeamRange, PolarityType, RadioMac, ScanMode, ScanReq, ScanSubType, ScanToken, ScanType,
};

use crate::config::ScanConfig;
use crate::duration::{purpose_for, reserved_len_bwgd};
use crate::error::ScanError;

/// Everything [`launch`] needs to build and schedule the per-radio
/// commands for one scan, mirroring `StartScan`'s relevant fields plus the
/// CBF main-link identity used to pick each radio's subtype.
#[derive(Debug, Clone)]
pub struct ScanLaunchRequest {
    pub scan_type: ScanType,
    pub scan_mode: ScanMode,
    pub sub_type: Option<ScanSubType>,
    pub tx: RadioMac,
    pub rxs: Vec<RadioMac>,
    pub requested_bwgd: u64,
    pub bwgd_len: Option<u32>,
    pub beams: Option<Vec<BeamRange>>,
    pub apply: Option<bool>,
    pub tx_pwr_index: Option<i16>,
    pub null_angle: Option<f32>,
    /// When both are set, the reserved BWGD is used verbatim as an
    /// apply-only command (step 2 of the launch protocol).
    pub apply_bwgd_idx: Option<u64>,
    pub cbf_beam_idx: Option<i16>,
    pub is_hybrid_link: bool,
    pub polarities: HashMap<RadioMac, PolarityType>,
    /// For CBF scans: which side of the main link this scan concerns, used
    /// to pick TX_CBF_AGGRESSOR/VICTIM vs RX_CBF_AGGRESSOR/VICTIM per radio.
    pub cbf_main_tx: Option<RadioMac>,
}

#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub start_bwgd_idx: u64,
    pub reqs: Vec<(RadioMac, ScanReq)>,
}

/// Implements `sendScanToTxAndRxNodes` (`spec.md` §4.F.3): resolves the
/// start BWGD (via the slot scheduler, unless this is an apply-only
/// command reusing a reserved BWGD), then builds each radio's `ScanReq`.
pub async fn launch(
    slotsched: &SlotSchedulerHandle,
    token: ScanToken,
    req: &ScanLaunchRequest,
) -> Result<LaunchPlan, ScanError> {
    let start_bwgd_idx = if let (Some(apply_bwgd), Some(_cbf_beam)) =
        (req.apply_bwgd_idx, req.cbf_beam_idx)
    {
        apply_bwgd
    } else {
        let purpose = purpose_for(req.scan_type, req.is_hybrid_link);
        let len = reserved_len_bwgd(req.scan_mode, req.bwgd_len, req.is_hybrid_link);
        slotsched
            .adjust_bwgd(purpose, req.requested_bwgd, len, req.tx, req.rxs.clone())
            .await?
    };

    let mut reqs = Vec::with_capacity(1 + req.rxs.len());
    reqs.push((
        req.tx,
        build_req(req, token, start_bwgd_idx, req.tx, false),
    ));
    for &rx in &req.rxs {
        let tx_pol = req.polarities.get(&req.tx).copied();
        let rx_pol = req.polarities.get(&rx).copied();
        let invert = matches!((tx_pol, rx_pol), (Some(a), Some(b)) if a == b && a != PolarityType::Hybrid);
        reqs.push((rx, build_req(req, token, start_bwgd_idx, rx, invert)));
    }

    Ok(LaunchPlan { start_bwgd_idx, reqs })
}

/// Builds the command addressed to `radio`. Per `spec.md` §6's `ScanReq`
/// shape, `tx_node_mac`/`rx_node_mac` describe the *peer* from `radio`'s
/// point of view: the tx radio's command carries its (first) rx peer, and
/// each rx radio's command carries the tx peer.
fn build_req(
    req: &ScanLaunchRequest,
    token: ScanToken,
    start_bwgd_idx: u64,
    radio: RadioMac,
    invert_polarity: bool,
) -> ScanReq {
    let sub_type = cbf_sub_type(req, radio).or(req.sub_type);
    let (tx_node_mac, rx_node_mac) = if radio == req.tx {
        (None, req.rxs.first().copied())
    } else {
        (Some(req.tx), None)
    };
    ScanReq {
        token,
        scan_type: req.scan_type,
        scan_mode: req.scan_mode,
        sub_type,
        start_bwgd_idx,
        bwgd_len: req.bwgd_len,
        beams: req.beams.clone(),
        rx_node_mac,
        tx_node_mac,
        radio_mac: radio,
        apply: req.apply,
        bf_scan_invert_polarity: invert_polarity,
        tx_pwr_index: req.tx_pwr_index,
        null_angle: req.null_angle,
        cbf_beam_idx: req.cbf_beam_idx,
    }
}

/// Step 4 of the launch protocol: `(main==tx, CBF_TX) -> TX_CBF_AGGRESSOR`;
/// `(main!=tx, CBF_TX) -> TX_CBF_VICTIM`; RX symmetric.
fn cbf_sub_type(req: &ScanLaunchRequest, radio: RadioMac) -> Option<ScanSubType> {
    let main_tx = req.cbf_main_tx?;
    let is_main = radio == main_tx;
    match (req.scan_type, is_main) {
        (ScanType::CbfTx, true) => Some(ScanSubType::TxCbfAggressor),
        (ScanType::CbfTx, false) => Some(ScanSubType::TxCbfVictim),
        (ScanType::CbfRx, true) => Some(ScanSubType::RxCbfAggressor),
        (ScanType::CbfRx, false) => Some(ScanSubType::RxCbfVictim),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_slotsched::SlotMapConfig;
    use tg_types::SlotPurpose;

    fn mac(l: &str) -> RadioMac {
        RadioMac::test_mac(l)
    }

    #[tokio::test]
    async fn builds_one_req_per_radio_with_matching_polarity_inverted() {
        let handle = SlotSchedulerHandle::spawn(SlotMapConfig::default(), 18);
        let mut polarities = HashMap::new();
        polarities.insert(mac("AA"), PolarityType::Odd);
        polarities.insert(mac("BB"), PolarityType::Odd);

        let req = ScanLaunchRequest {
            scan_type: ScanType::Pbf,
            scan_mode: ScanMode::Fine,
            sub_type: None,
            tx: mac("AA"),
            rxs: vec![mac("BB")],
            requested_bwgd: 0,
            bwgd_len: None,
            beams: None,
            apply: None,
            tx_pwr_index: None,
            null_angle: None,
            apply_bwgd_idx: None,
            cbf_beam_idx: None,
            is_hybrid_link: false,
            polarities,
            cbf_main_tx: None,
        };

        let plan = launch(&handle, 1, &req).await.unwrap();
        assert_eq!(plan.reqs.len(), 2);
        let (_, tx_req) = &plan.reqs[0];
        assert!(!tx_req.bf_scan_invert_polarity);
        let (_, rx_req) = &plan.reqs[1];
        assert!(rx_req.bf_scan_invert_polarity);
        let _ = SlotPurpose::Pbf;
    }

    #[tokio::test]
    async fn apply_only_command_reuses_reserved_bwgd() {
        let handle = SlotSchedulerHandle::spawn(SlotMapConfig::default(), 18);
        let req = ScanLaunchRequest {
            scan_type: ScanType::CbfRx,
            scan_mode: ScanMode::Coarse,
            sub_type: None,
            tx: mac("AA"),
            rxs: vec![mac("BB")],
            requested_bwgd: 0,
            bwgd_len: None,
            beams: None,
            apply: Some(true),
            tx_pwr_index: None,
            null_angle: None,
            apply_bwgd_idx: Some(999),
            cbf_beam_idx: Some(70),
            is_hybrid_link: false,
            polarities: HashMap::new(),
            cbf_main_tx: Some(mac("AA")),
        };
        let plan = launch(&handle, 1, &req).await.unwrap();
        assert_eq!(plan.start_bwgd_idx, 999);
    }
}
