use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tg_rfstate::{RfStateSnapshot, RfStateStore};
use tg_slotsched::SlotSchedulerHandle;
use tg_transport::ScanTransport;
use tg_types::{
    RadioMac, Scan, ScanId, ScanResp, ScanToken, ScanType, StartScanRequest, TopologyView,
};

use crate::aggregate::{postprocess, PostProcessOutcome};
use crate::cbf::{generate_cbf_config, CbfScanPlan};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::latpc::{update_max_mcs, MaxMcsTable};
use crate::launch::{launch, ScanLaunchRequest};
use crate::store::{Completion, ScanStatusFilter, ScanStore};
use crate::validate::{validate, ValidatedRequest};
use crate::watchdog::SkewWatchdog;

/// Ties `tg-scan`'s pieces together behind the public API `spec.md` §4.F.1
/// names: validation, launch, response bookkeeping, and the type-specific
/// post-processing/retention pipeline. Holds no network I/O of its own —
/// delivery goes through [`ScanTransport`], and a current [`TopologyView`]
/// is supplied by the caller (the controller's topology store) on every
/// call that needs one.
pub struct ScanOrchestrator {
    cfg: ScanConfig,
    store: ScanStore,
    rfstate: RfStateStore,
    cbf_config: HashMap<String, CbfScanPlan>,
    max_mcs: MaxMcsTable,
    watchdog: SkewWatchdog,
    slotsched: SlotSchedulerHandle,
    transport: Arc<dyn ScanTransport>,
}

impl ScanOrchestrator {
    pub fn new(cfg: ScanConfig, slotsched: SlotSchedulerHandle, transport: Arc<dyn ScanTransport>) -> Self {
        Self {
            cfg,
            store: ScanStore::new(),
            rfstate: RfStateStore::new(),
            cbf_config: HashMap::new(),
            max_mcs: MaxMcsTable::new(),
            watchdog: SkewWatchdog::default(),
            slotsched,
            transport,
        }
    }

    /// `StartScan` (`spec.md` §4.F.1/.2/.3): validates, resolves a BWGD via
    /// the slot scheduler, and fires the per-radio commands. Returns the
    /// token radios will reply with.
    pub async fn start_scan(&mut self, req: StartScanRequest, topo: &dyn TopologyView) -> Result<ScanToken, ScanError> {
        let validated = validate(&req, Some(topo))?;
        let (launch_req, responders) = self.build_launch_request(validated, topo)?;

        let scan = blank_scan(&launch_req, responders);
        let (scan_id, token) = self.store.insert(scan);

        let plan = launch(&self.slotsched, token, &launch_req).await;
        let plan = match plan {
            Ok(p) => p,
            Err(e) => {
                self.store.finalize(scan_id, Completion::Timeout, self.cfg.scan_max_results);
                return Err(e);
            }
        };
        if let Some(s) = self.store.scan_mut(scan_id) {
            s.start_bwgd = plan.start_bwgd_idx;
        }

        for (radio, req) in plan.reqs {
            if let Err(e) = self.transport.send_scan_req(radio, req) {
                tracing::warn!(?radio, error = %e, "scan command delivery failed");
            }
        }

        tracing::debug!(scan_id, token, "scan launched");
        Ok(token)
    }

    fn build_launch_request(
        &self,
        validated: ValidatedRequest,
        topo: &dyn TopologyView,
    ) -> Result<(ScanLaunchRequest, Vec<RadioMac>), ScanError> {
        match validated {
            ValidatedRequest::PbfRtcalIm {
                scan_type,
                scan_mode,
                sub_type,
                tx_node,
                rx_nodes,
                beams,
                bwgd_len,
                start_time,
                apply,
            } => {
                let tx_is_hybrid = topo.radio_polarity(&tx_node) == Some(tg_types::PolarityType::Hybrid);
                let is_hybrid_link = tx_is_hybrid
                    || rx_nodes
                        .iter()
                        .any(|rx| topo.radio_polarity(rx) == Some(tg_types::PolarityType::Hybrid));
                let mut responders = vec![tx_node];
                responders.extend(rx_nodes.iter().copied());
                let requested_bwgd = tg_time::unix_time_to_bwgd(start_time, self.cfg.leap_seconds);
                let req = ScanLaunchRequest {
                    scan_type,
                    scan_mode,
                    sub_type,
                    tx: tx_node,
                    rxs: rx_nodes,
                    requested_bwgd,
                    bwgd_len,
                    beams,
                    apply,
                    tx_pwr_index: None,
                    null_angle: None,
                    apply_bwgd_idx: None,
                    cbf_beam_idx: None,
                    is_hybrid_link,
                    polarities: polarity_map(topo, &responders),
                    cbf_main_tx: None,
                };
                Ok((req, responders))
            }
            ValidatedRequest::Cbf {
                scan_type,
                main_tx_node,
                main_rx_node,
                aux_tx_nodes,
                aux_rx_nodes,
                tx_pwr_index,
                aux_tx_pwr_index: _,
                null_angle,
                cbf_beam_idx,
                apply_bwgd_idx,
                set_config: _,
                start_time,
            } => {
                let mut responders = vec![main_tx_node, main_rx_node];
                responders.extend(aux_tx_nodes.iter().copied());
                responders.extend(aux_rx_nodes.iter().copied());
                let requested_bwgd = tg_time::unix_time_to_bwgd(start_time, self.cfg.leap_seconds);
                let mut rxs = vec![main_rx_node];
                rxs.extend(aux_tx_nodes.iter().copied());
                rxs.extend(aux_rx_nodes.iter().copied());
                let req = ScanLaunchRequest {
                    scan_type,
                    scan_mode: tg_types::ScanMode::Fine,
                    sub_type: None,
                    tx: main_tx_node,
                    rxs,
                    requested_bwgd,
                    bwgd_len: None,
                    beams: None,
                    apply: Some(true),
                    tx_pwr_index,
                    null_angle,
                    apply_bwgd_idx,
                    cbf_beam_idx,
                    is_hybrid_link: false,
                    polarities: HashMap::new(),
                    cbf_main_tx: Some(main_tx_node),
                };
                Ok((req, responders))
            }
            ValidatedRequest::Topo { tx_node, start_time } => {
                let requested_bwgd = tg_time::unix_time_to_bwgd(start_time, self.cfg.leap_seconds);
                let req = ScanLaunchRequest {
                    scan_type: ScanType::Topo,
                    scan_mode: tg_types::ScanMode::Coarse,
                    sub_type: None,
                    tx: tx_node,
                    rxs: vec![],
                    requested_bwgd,
                    bwgd_len: None,
                    beams: None,
                    apply: None,
                    tx_pwr_index: None,
                    null_angle: None,
                    apply_bwgd_idx: None,
                    cbf_beam_idx: None,
                    is_hybrid_link: false,
                    polarities: HashMap::new(),
                    cbf_main_tx: None,
                };
                Ok((req, vec![tx_node]))
            }
        }
    }

    /// Records one radio's response (`spec.md` §4.F.4). When this completes
    /// the scan, runs post-processing and finalizes it; returns the outcome
    /// Looks up the scan a token belongs to, for callers that need to key
    /// a deadline timer off `expire_scan` without tracking the mapping
    /// themselves.
    pub fn scan_id_for_token(&self, token: ScanToken) -> Option<ScanId> {
        self.store.scan_id_for_token(token)
    }

    /// for scans that just completed, `None` for still-pending scans.
    pub fn record_response(
        &mut self,
        token: ScanToken,
        mac: RadioMac,
        resp: ScanResp,
        topo: &dyn TopologyView,
    ) -> Result<Option<PostProcessOutcome>, ScanError> {
        self.watchdog.check(
            resp.cur_superframe_num,
            tg_time::unix_time_to_bwgd(tg_time::unix_now_secs(), self.cfg.leap_seconds),
            self.cfg.leap_seconds,
            self.cfg.scans_start_time_offset_s,
            std::time::Instant::now(),
        );

        let completed = self.store.record_response(token, mac, resp)?;
        if !completed {
            return Ok(None);
        }
        let scan_id = self.store.scan_id_for_token(token).ok_or(ScanError::UnknownToken)?;
        Ok(Some(self.finish_scan(scan_id, Completion::AllResponses, topo)))
    }

    /// Fires the per-scan deadline (`scan_all_responses_timeout`): finalizes
    /// whatever responses arrived, marking the scan timed out.
    pub fn expire_scan(&mut self, scan_id: ScanId, topo: &dyn TopologyView) -> PostProcessOutcome {
        self.finish_scan(scan_id, Completion::Timeout, topo)
    }

    fn finish_scan(&mut self, scan_id: ScanId, completion: Completion, topo: &dyn TopologyView) -> PostProcessOutcome {
        let outcome = match self.store.scan(scan_id) {
            Some(scan) => postprocess(scan, &mut self.rfstate, topo, &self.cfg),
            None => PostProcessOutcome::None,
        };
        self.store.finalize(scan_id, completion, self.cfg.scan_max_results);
        outcome
    }

    pub fn get_scan_status(&self, filter: &ScanStatusFilter) -> Vec<Scan> {
        self.store.get_status(filter)
    }

    pub fn reset_scan_status(&mut self) {
        self.store.reset();
    }

    pub fn get_rf_state(&self) -> RfStateSnapshot {
        self.rfstate.to_snapshot()
    }

    pub fn set_rf_state(&mut self, snapshot: RfStateSnapshot) {
        self.rfstate.load_snapshot(snapshot);
    }

    pub fn reset_rf_state(&mut self) {
        self.rfstate.reset();
    }

    /// Whether RF state has changed since the last `set_cbf_config` — the
    /// gate the combined scan loop uses before refreshing CBF config
    /// (`spec.md` §4.F.5).
    pub fn rf_state_dirty(&self) -> bool {
        self.rfstate.is_dirty()
    }

    /// Recomputes `laMaxMcs` from current RF state, per `spec.md` §4.F.8.
    /// A no-op (and clears nothing) when `la_tpc_auto_enabled` is false.
    pub fn set_la_tpc_params(&mut self, topo: &dyn TopologyView) -> &MaxMcsTable {
        if self.cfg.la_tpc_auto_enabled {
            self.max_mcs = update_max_mcs(topo, &self.rfstate, &self.cfg);
        }
        &self.max_mcs
    }

    pub fn get_cbf_config(&self) -> &HashMap<String, CbfScanPlan> {
        &self.cbf_config
    }

    /// Regenerates the CBF scan plan from current RF state and topology
    /// (`spec.md` §4.F.6), keyed per [`CbfScanPlan::key`].
    pub fn set_cbf_config(&mut self, topo: &dyn TopologyView) {
        self.cbf_config.clear();
        for scan_type in [ScanType::CbfTx, ScanType::CbfRx] {
            for plan in generate_cbf_config(topo, &self.rfstate, &self.cfg, scan_type) {
                self.cbf_config.insert(plan.key(), plan);
            }
        }
        self.rfstate.clear_dirty();
    }

    pub fn reset_cbf_config(&mut self) {
        self.cbf_config.clear();
    }

    pub fn config(&self) -> &ScanConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: ScanConfig) {
        self.cfg = cfg;
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.cfg.scan_all_responses_timeout_s)
    }
}

fn polarity_map(topo: &dyn TopologyView, macs: &[RadioMac]) -> HashMap<RadioMac, tg_types::PolarityType> {
    macs.iter()
        .filter_map(|&m| topo.radio_polarity(&m).map(|p| (m, p)))
        .collect()
}

fn blank_scan(req: &ScanLaunchRequest, responders: Vec<RadioMac>) -> Scan {
    let n_responses_waiting = responders.len() as u32;
    Scan {
        scan_id: 0,
        group_id: None,
        scan_type: req.scan_type,
        scan_mode: req.scan_mode,
        sub_type: req.sub_type,
        tx_node: Some(req.tx),
        rx_nodes: responders.into_iter().filter(|m| *m != req.tx).collect(),
        start_bwgd: req.requested_bwgd,
        apply_bwgd: req.apply_bwgd_idx,
        apply: req.apply,
        bwgd_len: req.bwgd_len,
        beams: req.beams.clone(),
        responses: HashMap::new(),
        n_responses_waiting,
        resp_id: None,
        timed_out: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_slotsched::SlotMapConfig;
    use tg_transport::RecordingTransport;
    use tg_types::{Location, Node, NodeType, PolarityType, Site};

    struct FakeTopo;

    impl TopologyView for FakeTopo {
        fn all_nodes(&self) -> Vec<Node> {
            vec![]
        }
        fn all_links(&self) -> Vec<tg_types::Link> {
            vec![]
        }
        fn node_by_mac(&self, _mac: &RadioMac) -> Option<Node> {
            None
        }
        fn site(&self, name: &str) -> Option<Site> {
            Some(Site { name: name.to_string(), location: Location { latitude: 0.0, longitude: 0.0 } })
        }
        fn radio_polarity(&self, _mac: &RadioMac) -> Option<PolarityType> {
            None
        }
    }

    fn mac(l: &str) -> RadioMac {
        RadioMac::test_mac(l)
    }

    #[tokio::test]
    async fn start_scan_delivers_to_every_radio() {
        let slotsched = SlotSchedulerHandle::spawn(SlotMapConfig::default(), 18);
        let transport = Arc::new(RecordingTransport::default());
        let mut orch = ScanOrchestrator::new(ScanConfig::default(), slotsched, transport.clone());
        let topo = FakeTopo;

        let req = StartScanRequest {
            scan_type: Some(ScanType::Pbf),
            scan_mode: Some(tg_types::ScanMode::Fine),
            tx_node: Some(mac("AA")),
            rx_nodes: Some(vec![mac("BB")]),
            ..Default::default()
        };
        let token = orch.start_scan(req, &topo).await.unwrap();
        assert!(token > 0);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn record_response_completes_after_all_radios_reply() {
        let slotsched = SlotSchedulerHandle::spawn(SlotMapConfig::default(), 18);
        let transport = Arc::new(RecordingTransport::default());
        let mut orch = ScanOrchestrator::new(ScanConfig::default(), slotsched, transport);
        let topo = FakeTopo;

        let req = StartScanRequest {
            scan_type: Some(ScanType::Pbf),
            scan_mode: Some(tg_types::ScanMode::Fine),
            tx_node: Some(mac("AA")),
            rx_nodes: Some(vec![mac("BB")]),
            ..Default::default()
        };
        let token = orch.start_scan(req, &topo).await.unwrap();

        let r1 = orch
            .record_response(token, mac("AA"), ScanResp::minimal(token, tg_types::ScanFwStatus::Complete, 0), &topo)
            .unwrap();
        assert!(r1.is_none());
        let r2 = orch
            .record_response(token, mac("BB"), ScanResp::minimal(token, tg_types::ScanFwStatus::Complete, 0), &topo)
            .unwrap();
        assert!(r2.is_some());
    }
}
