//! The controller's scan-orchestration actor. Owns the [`ScanOrchestrator`]
//! and the topology view exclusively, the same single-mailbox-per-app
//! pattern `tg-slotsched::SlotSchedulerHandle` uses: callers never touch
//! orchestrator state directly, only through messages and a one-shot reply.
//!
//! Also runs the two periodic scan loops from `spec.md` §4.F.5 and the
//! per-scan "all responses" deadline timers from §4.F.4, on the same task
//! so nothing races the orchestrator's `&mut self` methods.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tg_rfstate::RfStateSnapshot;
use tg_scan::{CbfScanPlan, PostProcessOutcome, ScanConfig, ScanOrchestrator, ScanStatusFilter};
use tg_slotsched::SlotSchedulerHandle;
use tg_topology::ColorScheduler;
use tg_transport::{ScanResultSink, ScanTransport};
use tg_types::{RadioMac, Scan, ScanId, ScanMode, ScanResp, ScanToken, ScanType, StartScanRequest, TopologyView};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::topology::TopologyStore;

enum Command {
    StartScan {
        req: StartScanRequest,
        reply: oneshot::Sender<Result<ScanToken, tg_scan::ScanError>>,
    },
    RecordResponse {
        token: ScanToken,
        mac: RadioMac,
        resp: ScanResp,
        reply: oneshot::Sender<Result<Option<PostProcessOutcome>, tg_scan::ScanError>>,
    },
    ExpireScan {
        scan_id: ScanId,
        token: ScanToken,
    },
    GetScanStatus {
        filter: ScanStatusFilter,
        reply: oneshot::Sender<Vec<Scan>>,
    },
    ResetScanStatus {
        reply: oneshot::Sender<()>,
    },
    GetRfState {
        reply: oneshot::Sender<RfStateSnapshot>,
    },
    SetRfState {
        snapshot: RfStateSnapshot,
        reply: oneshot::Sender<()>,
    },
    ResetRfState {
        reply: oneshot::Sender<()>,
    },
    SetLaTpcParams {
        reply: oneshot::Sender<()>,
    },
    GetCbfConfig {
        reply: oneshot::Sender<HashMap<String, CbfScanPlan>>,
    },
    ResetCbfConfig {
        reply: oneshot::Sender<()>,
    },
    RunImScanLoop,
    RunCombinedScanLoop,
}

/// A cloneable handle to the controller's scan orchestrator task.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
}

impl ControllerHandle {
    pub fn spawn(
        cfg: ScanConfig,
        slotsched: SlotSchedulerHandle,
        transport: Arc<dyn ScanTransport>,
        sink: Arc<dyn ScanResultSink>,
        topology: TopologyStore,
        scan_max_distance_m: f64,
        im_scan_period: Duration,
        combined_scan_period: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let orch = ScanOrchestrator::new(cfg, slotsched, transport);
        tokio::spawn(run(orch, sink, topology, scan_max_distance_m, tx.clone(), rx));

        tokio::spawn(periodic_trigger(im_scan_period, tx.clone(), || Command::RunImScanLoop, "im scan loop"));
        tokio::spawn(periodic_trigger(combined_scan_period, tx.clone(), || Command::RunCombinedScanLoop, "combined scan loop"));

        Self { tx }
    }

    pub async fn start_scan(&self, req: StartScanRequest) -> Result<ScanToken, tg_scan::ScanError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::StartScan { req, reply }).await;
        recv.await.unwrap_or(Err(tg_scan::ScanError::UnknownToken))
    }

    pub async fn record_response(
        &self,
        token: ScanToken,
        mac: RadioMac,
        resp: ScanResp,
    ) -> Result<Option<PostProcessOutcome>, tg_scan::ScanError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::RecordResponse { token, mac, resp, reply }).await;
        recv.await.unwrap_or(Err(tg_scan::ScanError::UnknownToken))
    }

    pub async fn get_scan_status(&self, filter: ScanStatusFilter) -> Vec<Scan> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetScanStatus { filter, reply }).await;
        recv.await.unwrap_or_default()
    }

    pub async fn reset_scan_status(&self) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::ResetScanStatus { reply }).await;
        let _ = recv.await;
    }

    pub async fn get_rf_state(&self) -> RfStateSnapshot {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetRfState { reply }).await;
        recv.await.unwrap_or_default()
    }

    pub async fn set_rf_state(&self, snapshot: RfStateSnapshot) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::SetRfState { snapshot, reply }).await;
        let _ = recv.await;
    }

    pub async fn reset_rf_state(&self) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::ResetRfState { reply }).await;
        let _ = recv.await;
    }

    pub async fn set_la_tpc_params(&self) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::SetLaTpcParams { reply }).await;
        let _ = recv.await;
    }

    pub async fn get_cbf_config(&self) -> HashMap<String, CbfScanPlan> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetCbfConfig { reply }).await;
        recv.await.unwrap_or_default()
    }

    pub async fn reset_cbf_config(&self) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::ResetCbfConfig { reply }).await;
        let _ = recv.await;
    }
}

async fn periodic_trigger(period: Duration, tx: mpsc::Sender<Command>, make: impl Fn() -> Command, name: &'static str) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        tracing::trace!(name, "periodic scan loop tick");
        if tx.send(make()).await.is_err() {
            break;
        }
    }
}

/// `spec.md` §4.F.5 IM loop: per color class, per radio, scan its
/// hearability-plus-CN-adjacency target set when nonempty.
async fn launch_im_scans(orch: &mut ScanOrchestrator, topo: &dyn TopologyView, scan_max_distance_m: f64) -> Vec<ScanToken> {
    let colorer = ColorScheduler::build(topo, scan_max_distance_m);
    let mut rng = rand::thread_rng();
    let mut tokens = Vec::new();
    for group in colorer.sched_groups(&mut rng) {
        for (tx, targets) in tg_scan::im_scan_plan_for_group(&colorer, topo, &group) {
            let req = StartScanRequest {
                scan_type: Some(ScanType::Im),
                scan_mode: Some(ScanMode::Coarse),
                tx_node: Some(tx),
                rx_nodes: Some(targets),
                start_time: Some(tg_time::unix_now_secs()),
                ..Default::default()
            };
            match orch.start_scan(req, topo).await {
                Ok(token) => tokens.push(token),
                Err(e) => tracing::warn!(?tx, error = %e, "im scan loop: launch failed"),
            }
        }
    }
    tokens
}

/// Order from `spec.md` §4.F.5: CBF config refresh, CBF_TX, CBF_RX, then an
/// IM pass (relative, applying results, when LA/TPC auto is enabled). The
/// PBF/RTCAL leg iterates every wireless link directly since that family
/// needs no color-class batching.
async fn launch_combined_scans(orch: &mut ScanOrchestrator, topo: &dyn TopologyView, scan_max_distance_m: f64) -> Vec<ScanToken> {
    let cfg = orch.config().clone();
    let mut tokens = Vec::new();

    if cfg.pbf_rtcal_enabled {
        for link in topo.all_links() {
            let req = StartScanRequest {
                scan_type: Some(ScanType::Pbf),
                scan_mode: Some(ScanMode::Fine),
                tx_node: Some(link.a_node_mac),
                rx_nodes: Some(vec![link.z_node_mac]),
                start_time: Some(tg_time::unix_now_secs()),
                ..Default::default()
            };
            match orch.start_scan(req, topo).await {
                Ok(token) => tokens.push(token),
                Err(e) => tracing::warn!(link = %link.name, error = %e, "combined loop: pbf launch failed"),
            }
        }
    }

    if cfg.cbf_enabled && orch.rf_state_dirty() && !orch.get_rf_state().im.is_empty() {
        orch.set_cbf_config(topo);
    }

    if cfg.cbf_enabled {
        let plans: Vec<CbfScanPlan> = orch.get_cbf_config().values().cloned().collect();
        for plan in plans {
            let req = StartScanRequest {
                scan_type: Some(plan.scan_type),
                scan_mode: Some(ScanMode::Fine),
                main_tx_node: Some(plan.main_tx),
                main_rx_node: Some(plan.main_rx),
                aux_tx_nodes: Some(plan.aux.iter().map(|a| a.aux_tx).collect()),
                aux_rx_nodes: Some(plan.aux.iter().map(|a| a.aux_rx).collect()),
                tx_pwr_index: plan.main_tx_pwr_index,
                start_time: Some(tg_time::unix_now_secs()),
                ..Default::default()
            };
            match orch.start_scan(req, topo).await {
                Ok(token) => tokens.push(token),
                Err(e) => tracing::warn!(key = %plan.key(), error = %e, "combined loop: cbf launch failed"),
            }
        }
    }

    let colorer = ColorScheduler::build(topo, scan_max_distance_m);
    let mut rng = rand::thread_rng();
    for group in colorer.sched_groups(&mut rng) {
        for (tx, targets) in tg_scan::im_scan_plan_for_group(&colorer, topo, &group) {
            let req = StartScanRequest {
                scan_type: Some(ScanType::Im),
                scan_mode: Some(ScanMode::Relative),
                tx_node: Some(tx),
                rx_nodes: Some(targets),
                apply: Some(cfg.la_tpc_auto_enabled),
                start_time: Some(tg_time::unix_now_secs()),
                ..Default::default()
            };
            match orch.start_scan(req, topo).await {
                Ok(token) => tokens.push(token),
                Err(e) => tracing::warn!(?tx, error = %e, "combined loop: rel-im launch failed"),
            }
        }
    }

    tokens
}

async fn deliver_to_sink(orch: &ScanOrchestrator, sink: &dyn ScanResultSink, token: ScanToken) {
    let filter = ScanStatusFilter {
        token_range: Some((token, token)),
        ..Default::default()
    };
    if let Some(scan) = orch.get_scan_status(&filter).into_iter().next() {
        sink.on_scan_complete(&scan);
    }
}

fn schedule_deadline(orch: &ScanOrchestrator, token: ScanToken, tx: &mpsc::Sender<Command>) -> Option<(ScanId, JoinHandle<()>)> {
    let scan_id = orch.scan_id_for_token(token)?;
    let deadline = orch.scan_timeout();
    let tx = tx.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        let _ = tx.send(Command::ExpireScan { scan_id, token }).await;
    });
    Some((scan_id, handle))
}

async fn run(
    mut orch: ScanOrchestrator,
    sink: Arc<dyn ScanResultSink>,
    topology: TopologyStore,
    scan_max_distance_m: f64,
    self_tx: mpsc::Sender<Command>,
    mut rx: mpsc::Receiver<Command>,
) {
    let mut deadlines: HashMap<ScanId, JoinHandle<()>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::StartScan { req, reply } => {
                let result = orch.start_scan(req, &topology).await;
                if let Ok(token) = result {
                    if let Some((scan_id, handle)) = schedule_deadline(&orch, token, &self_tx) {
                        deadlines.insert(scan_id, handle);
                    }
                }
                let _ = reply.send(result);
            }
            Command::RecordResponse { token, mac, resp, reply } => {
                let result = orch.record_response(token, mac, resp, &topology);
                if let Ok(Some(ref outcome)) = result {
                    if let Some(scan_id) = orch.scan_id_for_token(token) {
                        if let Some(handle) = deadlines.remove(&scan_id) {
                            handle.abort();
                        }
                    }
                    deliver_to_sink(&orch, sink.as_ref(), token).await;
                    if matches!(outcome, PostProcessOutcome::RelIm { .. }) && orch.config().la_tpc_auto_enabled {
                        orch.set_la_tpc_params(&topology);
                    }
                }
                let _ = reply.send(result);
            }
            Command::ExpireScan { scan_id, token } => {
                if deadlines.remove(&scan_id).is_none() {
                    // Already completed (and its timer already aborted) via
                    // RecordResponse; nothing left to finalize.
                    continue;
                }
                let outcome = orch.expire_scan(scan_id, &topology);
                deliver_to_sink(&orch, sink.as_ref(), token).await;
                if matches!(outcome, PostProcessOutcome::RelIm { .. }) && orch.config().la_tpc_auto_enabled {
                    orch.set_la_tpc_params(&topology);
                }
            }
            Command::GetScanStatus { filter, reply } => {
                let _ = reply.send(orch.get_scan_status(&filter));
            }
            Command::ResetScanStatus { reply } => {
                orch.reset_scan_status();
                let _ = reply.send(());
            }
            Command::GetRfState { reply } => {
                let _ = reply.send(orch.get_rf_state());
            }
            Command::SetRfState { snapshot, reply } => {
                orch.set_rf_state(snapshot);
                let _ = reply.send(());
            }
            Command::ResetRfState { reply } => {
                orch.reset_rf_state();
                let _ = reply.send(());
            }
            Command::SetLaTpcParams { reply } => {
                orch.set_la_tpc_params(&topology);
                let _ = reply.send(());
            }
            Command::GetCbfConfig { reply } => {
                let _ = reply.send(orch.get_cbf_config().clone());
            }
            Command::ResetCbfConfig { reply } => {
                orch.reset_cbf_config();
                let _ = reply.send(());
            }
            Command::RunImScanLoop => {
                let tokens = launch_im_scans(&mut orch, &topology, scan_max_distance_m).await;
                for token in tokens {
                    if let Some((scan_id, handle)) = schedule_deadline(&orch, token, &self_tx) {
                        deadlines.insert(scan_id, handle);
                    }
                }
            }
            Command::RunCombinedScanLoop => {
                let tokens = launch_combined_scans(&mut orch, &topology, scan_max_distance_m).await;
                for token in tokens {
                    if let Some((scan_id, handle)) = schedule_deadline(&orch, token, &self_tx) {
                        deadlines.insert(scan_id, handle);
                    }
                }
            }
        }
    }
}

