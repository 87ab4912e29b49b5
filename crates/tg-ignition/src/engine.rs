//! Minion-side ignition state machine (`spec.md` §4.G). One [`IgnitionEngine`]
//! tracks every radio on the node; each radio has its own
//! `Idle -> Requesting -> LinkUpWaitAuth -> LinkUp` sequence, and the engine
//! is a pure state transformer: every handler takes the relevant event and
//! returns the [`Effect`]s the caller (the single cooperative loop named in
//! `spec.md` §5) must carry out — send a driver command, start/cancel a
//! timer, spawn or kill a helper process, or notify the controller. No I/O
//! happens inside this module.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use tg_transport::DriverCommand;
use tg_types::{LinkStatusType, RadioMac};

/// Default exclusivity timer: how long the engine waits for a responder to
/// finish ignoring before giving up and resetting to `Idle`.
pub const DEFAULT_LINKUP_RESP_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-radio LINK_PAUSE -> dissoc timer.
pub const DEFAULT_LINK_PAUSE_DISSOC_DELAY: Duration = Duration::from_secs(1200);

/// Settle delay before a requested BF responder-mode disable actually fires.
pub const DEFAULT_BF_RESPONDER_SETTLE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct IgnitionConfig {
    pub linkup_resp_wait_timeout: Duration,
    pub link_pause_dissoc_delay: Duration,
    pub bf_responder_settle_delay: Duration,
    /// Every wsec helper-process interface name on this node, used on CN
    /// radios to fan a supplicant (re)start out across every other
    /// interface once wsec settles on the current one (`spec.md` §4.G
    /// items 4 and 7).
    pub all_ifnames: Vec<String>,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            linkup_resp_wait_timeout: DEFAULT_LINKUP_RESP_WAIT_TIMEOUT,
            link_pause_dissoc_delay: DEFAULT_LINK_PAUSE_DISSOC_DELAY,
            bf_responder_settle_delay: DEFAULT_BF_RESPONDER_SETTLE_DELAY,
            all_ifnames: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FsmState {
    Idle,
    Requesting,
    LinkUpWaitAuth,
}

#[derive(Debug, Clone, Default)]
struct RadioState {
    fsm_active: Option<FsmState>,
    cur_responder: Option<RadioMac>,
    wsec_enabled: bool,
    ifname: Option<String>,
    started_authenticator: bool,
    is_cn: bool,
}

impl RadioState {
    fn fsm(&self) -> FsmState {
        self.fsm_active.unwrap_or(FsmState::Idle)
    }
}

/// The timers the engine schedules. Each is keyed by `(radio, responder)`
/// except `BfResponderSettle`, which is keyed by `(radio, RadioMac::ZERO)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ResponseWait,
    LinkPauseDissoc,
    BfResponderSettle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnitionNotification {
    LinkUp { radio: RadioMac, responder: RadioMac },
    LinkDown { radio: RadioMac, responder: RadioMac },
    LinkAuthorized { radio: RadioMac, responder: RadioMac, wsec: u8 },
}

/// Everything the cooperative loop must carry out in response to one event.
/// Returned in the order they should be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Driver { radio: RadioMac, cmd: DriverCommand },
    StartAuthenticator(String),
    KillAuthenticator(String),
    StartSupplicant(String),
    KillSupplicant(String),
    Notify(IgnitionNotification),
    StartTimer {
        radio: RadioMac,
        responder: RadioMac,
        kind: TimerKind,
        duration: Duration,
    },
    CancelTimer {
        radio: RadioMac,
        responder: RadioMac,
        kind: TimerKind,
    },
}

/// Minion-side ignition engine: one instance per node, covering every
/// radio. See the module doc for the overall shape.
#[derive(Debug, Default)]
pub struct IgnitionEngine {
    cfg: IgnitionConfig,
    radios: HashMap<RadioMac, RadioState>,
    ignited: HashMap<RadioMac, HashMap<RadioMac, LinkStatusType>>,
    /// FIFO of radios with an outstanding `DevAllocReq`, matched against
    /// `DevAllocRes` in request order — the driver event carries only an
    /// ifname, not the responder it was allocated for.
    pending_alloc: VecDeque<RadioMac>,
    bf_responder_pending: HashSet<RadioMac>,
}

impl IgnitionEngine {
    pub fn new(cfg: IgnitionConfig) -> Self {
        Self {
            cfg,
            radios: HashMap::new(),
            ignited: HashMap::new(),
            pending_alloc: VecDeque::new(),
            bf_responder_pending: HashSet::new(),
        }
    }

    /// Declare a radio and whether its node is a CN, so CN-specific
    /// supplicant fan-out (`spec.md` §4.G items 4, 7) applies correctly.
    pub fn register_radio(&mut self, radio: RadioMac, is_cn: bool) {
        self.radios.entry(radio).or_default().is_cn = is_cn;
    }

    pub fn ignited_neighbors(&self, radio: RadioMac) -> Vec<RadioMac> {
        self.ignited
            .get(&radio)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Same as [`Self::ignited_neighbors`], but rejects radios this engine
    /// was never told about via [`Self::register_radio`] — used by status
    /// reporting, which should surface a config mismatch rather than
    /// silently reporting an empty neighbor set.
    pub fn ignited_neighbors_checked(&self, radio: RadioMac) -> Result<Vec<RadioMac>, crate::error::IgnitionError> {
        if !self.radios.contains_key(&radio) {
            return Err(crate::error::IgnitionError::UnknownRadio(radio));
        }
        Ok(self.ignited_neighbors(radio))
    }

    fn is_ignited_up(&self, radio: RadioMac, responder: RadioMac) -> bool {
        self.ignited
            .get(&radio)
            .and_then(|m| m.get(&responder))
            .copied()
            == Some(LinkStatusType::LinkUp)
    }

    /// Transition 1: `Idle + SetLinkUp(rsp)`.
    pub fn set_link_up(&mut self, radio: RadioMac, responder: RadioMac, wsec_enabled: bool) -> Vec<Effect> {
        if self.is_ignited_up(radio, responder) {
            return vec![Effect::Notify(IgnitionNotification::LinkUp { radio, responder })];
        }
        let state = self.radios.entry(radio).or_default();
        if state.cur_responder.is_some() {
            tracing::debug!(%radio, %responder, "ignition busy, second set-link-status dropped");
            return vec![];
        }
        state.cur_responder = Some(responder);
        state.fsm_active = Some(FsmState::Requesting);
        state.wsec_enabled = wsec_enabled;
        state.ifname = None;
        state.started_authenticator = false;

        let mut effects = vec![Effect::StartTimer {
            radio,
            responder,
            kind: TimerKind::ResponseWait,
            duration: self.cfg.linkup_resp_wait_timeout,
        }];
        if wsec_enabled {
            self.pending_alloc.push_back(radio);
            effects.push(Effect::Driver {
                radio,
                cmd: DriverCommand::DevAllocReq { responder },
            });
        } else {
            effects.push(Effect::Driver {
                radio,
                cmd: DriverCommand::SetLinkStatus { responder, up: true },
            });
        }
        effects
    }

    /// Transition 2: `Requesting + DriverDevAllocRes`.
    fn on_dev_alloc_res(&mut self, ifname: String, success: bool) -> Vec<Effect> {
        let Some(radio) = self.pending_alloc.pop_front() else {
            return vec![];
        };
        if !success {
            tracing::warn!(%radio, ifname, "interface allocation failed, leaving ignition in flight");
            return vec![];
        }
        let Some(state) = self.radios.get_mut(&radio) else {
            return vec![];
        };
        let Some(responder) = state.cur_responder else {
            return vec![];
        };
        state.ifname = Some(ifname.clone());
        state.started_authenticator = true;
        vec![
            Effect::KillSupplicant(ifname.clone()),
            Effect::StartAuthenticator(ifname),
            Effect::Driver {
                radio,
                cmd: DriverCommand::SetLinkStatus { responder, up: true },
            },
        ]
    }

    /// Transition 3: `Requesting + DriverLinkStatus(LINK_UP, rsp)`.
    fn on_link_up(&mut self, responder: RadioMac) -> Vec<Effect> {
        let Some((&radio, state)) = self
            .radios
            .iter_mut()
            .find(|(_, s)| s.cur_responder == Some(responder) && s.fsm() == FsmState::Requesting)
        else {
            return vec![];
        };
        self.ignited.entry(radio).or_default().insert(responder, LinkStatusType::LinkUp);
        let mut effects = vec![Effect::CancelTimer {
            radio,
            responder,
            kind: TimerKind::ResponseWait,
        }];
        if state.wsec_enabled {
            state.fsm_active = Some(FsmState::LinkUpWaitAuth);
        } else {
            effects.push(Effect::Notify(IgnitionNotification::LinkUp { radio, responder }));
            state.fsm_active = None;
            state.cur_responder = None;
        }
        effects
    }

    /// Transition 4: `LinkUpWaitAuth + DriverWsecLinkupStatus(ifname)`.
    fn on_wsec_linkup(&mut self, ifname: String) -> Vec<Effect> {
        let Some((&radio, state)) = self.radios.iter_mut().find(|(_, s)| {
            s.ifname.as_deref() == Some(ifname.as_str()) && s.fsm() == FsmState::LinkUpWaitAuth
        }) else {
            return vec![];
        };
        let responder = state.cur_responder.take();
        state.fsm_active = None;
        let is_cn = state.is_cn;
        let mut effects = Vec::new();
        if let Some(responder) = responder {
            effects.push(Effect::Notify(IgnitionNotification::LinkAuthorized { radio, responder, wsec: 1 }));
        }
        if is_cn {
            for other in &self.cfg.all_ifnames {
                if other.as_str() != ifname {
                    effects.push(Effect::KillSupplicant(other.clone()));
                }
            }
        }
        effects
    }

    /// Transition 5: `LinkUpWaitAuth + DriverWsecStatus(wsec=0, ifname)`.
    fn on_wsec_status(&mut self, ifname: String, wsec: u8) -> Vec<Effect> {
        if wsec != 0 {
            return vec![];
        }
        let Some((&radio, state)) = self.radios.iter_mut().find(|(_, s)| {
            s.ifname.as_deref() == Some(ifname.as_str()) && s.fsm() == FsmState::LinkUpWaitAuth
        }) else {
            return vec![];
        };
        let responder = state.cur_responder.take();
        state.fsm_active = None;
        let mut effects = vec![Effect::KillAuthenticator(ifname.clone()), Effect::KillSupplicant(ifname)];
        if let Some(responder) = responder {
            effects.push(Effect::Notify(IgnitionNotification::LinkAuthorized { radio, responder, wsec: 0 }));
        }
        effects
    }

    /// Transition 6: `any + timeout` on the exclusivity timer.
    fn on_response_wait_timeout(&mut self, radio: RadioMac, responder: RadioMac) -> Vec<Effect> {
        let Some(state) = self.radios.get_mut(&radio) else {
            return vec![];
        };
        if state.cur_responder != Some(responder) {
            return vec![]; // stale timer, already superseded
        }
        let mut effects = Vec::new();
        if state.started_authenticator {
            if let Some(ifname) = state.ifname.clone() {
                effects.push(Effect::StartSupplicant(ifname));
            }
        }
        let had_gone_up = self
            .ignited
            .get_mut(&radio)
            .map(|m| m.remove(&responder).is_some())
            .unwrap_or(false);
        if had_gone_up {
            effects.push(Effect::Notify(IgnitionNotification::LinkDown { radio, responder }));
        }
        state.fsm_active = None;
        state.cur_responder = None;
        state.ifname = None;
        state.started_authenticator = false;
        effects
    }

    /// Transition 7: `any + DriverLinkStatus(LINK_DOWN, rsp)`.
    fn on_link_down(&mut self, responder: RadioMac) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (&radio, ignited_map) in self.ignited.iter_mut() {
            if ignited_map.remove(&responder).is_some() {
                effects.push(Effect::CancelTimer { radio, responder, kind: TimerKind::LinkPauseDissoc });
                effects.push(Effect::Notify(IgnitionNotification::LinkDown { radio, responder }));
            }
        }
        for (&radio, state) in self.radios.iter_mut() {
            if state.cur_responder == Some(responder) && state.fsm() == FsmState::LinkUpWaitAuth {
                if let Some(ifname) = state.ifname.clone() {
                    effects.push(Effect::StartSupplicant(ifname.clone()));
                    if state.is_cn {
                        for other in &self.cfg.all_ifnames {
                            if *other != ifname {
                                effects.push(Effect::StartSupplicant(other.clone()));
                            }
                        }
                    }
                }
            }
        }
        effects
    }

    /// Transition 8 (start side): `LinkUp + DriverLinkStatus(LINK_PAUSE)`.
    fn on_link_pause(&mut self, responder: RadioMac) -> Vec<Effect> {
        for (&radio, ignited_map) in self.ignited.iter() {
            if ignited_map.get(&responder).copied() == Some(LinkStatusType::LinkUp) {
                return vec![Effect::StartTimer {
                    radio,
                    responder,
                    kind: TimerKind::LinkPauseDissoc,
                    duration: self.cfg.link_pause_dissoc_delay,
                }];
            }
        }
        vec![]
    }

    /// Transition 8 (fire side): the link-pause dissoc timer fired.
    fn on_link_pause_timeout(&mut self, radio: RadioMac, responder: RadioMac) -> Vec<Effect> {
        vec![Effect::Driver { radio, cmd: DriverCommand::SetLinkStatus { responder, up: false } }]
    }

    /// Transition 9: `any + DriverDevUpDownStatus(down)`.
    fn on_dev_up_down(&mut self, radio: RadioMac, down: bool) -> Vec<Effect> {
        if !down {
            return vec![];
        }
        let Some(map) = self.ignited.remove(&radio) else {
            return vec![];
        };
        map.into_keys()
            .map(|responder| Effect::Notify(IgnitionNotification::LinkDown { radio, responder }))
            .collect()
    }

    /// Dispatches a raw driver event. `radio` is needed only for
    /// [`tg_transport::DriverEvent::DevUpDownStatus`], which already
    /// carries it; every other variant resolves the owning radio from its
    /// own in-flight/ifname bookkeeping.
    pub fn on_driver_event(&mut self, event: tg_transport::DriverEvent) -> Vec<Effect> {
        use tg_transport::DriverEvent as E;
        match event {
            E::DevAllocRes { ifname, success } => self.on_dev_alloc_res(ifname, success),
            E::LinkStatus { responder, status } => match status {
                LinkStatusType::LinkUp => self.on_link_up(responder),
                LinkStatusType::LinkDown => self.on_link_down(responder),
                LinkStatusType::LinkPause => self.on_link_pause(responder),
            },
            E::WsecStatus { ifname, wsec } => self.on_wsec_status(ifname, wsec),
            E::WsecLinkupStatus { ifname } => self.on_wsec_linkup(ifname),
            E::DevUpDownStatus { radio, down } => self.on_dev_up_down(radio, down),
        }
    }

    /// Called by the owning loop when a timer it scheduled fires.
    pub fn on_timer(&mut self, radio: RadioMac, responder: RadioMac, kind: TimerKind) -> Vec<Effect> {
        match kind {
            TimerKind::ResponseWait => self.on_response_wait_timeout(radio, responder),
            TimerKind::LinkPauseDissoc => self.on_link_pause_timeout(radio, responder),
            TimerKind::BfResponderSettle => {
                if self.bf_responder_pending.remove(&radio) {
                    vec![Effect::Driver { radio, cmd: DriverCommand::SetLinkStatus { responder: RadioMac::ZERO, up: false } }]
                } else {
                    vec![]
                }
            }
        }
    }

    /// `BfSlotExclusionReq` is owned by the excluded-beamforming subsystem
    /// (out of scope, `spec.md` §1); this hook exists purely so the
    /// message dispatch table has a complete match arm.
    pub fn on_bf_slot_exclusion(&mut self, _radio: RadioMac) {}

    /// One-shot responder-mode disable with a settle delay (`spec.md`
    /// §4.H, `SPEC_FULL.md` §11). A repeat request while one is already
    /// pending is a no-op.
    pub fn disable_bf_responder_mode(&mut self, radio: RadioMac) -> Vec<Effect> {
        if !self.bf_responder_pending.insert(radio) {
            return vec![];
        }
        vec![Effect::StartTimer {
            radio,
            responder: RadioMac::ZERO,
            kind: TimerKind::BfResponderSettle,
            duration: self.cfg.bf_responder_settle_delay,
        }]
    }

    /// Cancels a pending settle-delay disable, if any.
    pub fn enable_bf_responder_mode(&mut self, radio: RadioMac) -> Vec<Effect> {
        if self.bf_responder_pending.remove(&radio) {
            vec![Effect::CancelTimer { radio, responder: RadioMac::ZERO, kind: TimerKind::BfResponderSettle }]
        } else {
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_transport::DriverEvent;

    fn radios() -> (RadioMac, RadioMac) {
        (RadioMac::test_mac("self"), RadioMac::test_mac("peer"))
    }

    #[test]
    fn happy_path_open_mode_ignites_and_tears_down() {
        // S5: wsec disabled end to end.
        let (radio, peer) = radios();
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        engine.register_radio(radio, false);

        let effects = engine.set_link_up(radio, peer, false);
        assert!(effects.iter().any(|e| matches!(e, Effect::Driver { cmd: DriverCommand::SetLinkStatus { up: true, .. }, .. })));

        let effects = engine.on_driver_event(DriverEvent::LinkStatus { responder: peer, status: LinkStatusType::LinkUp });
        assert!(effects.contains(&Effect::Notify(IgnitionNotification::LinkUp { radio, responder: peer })));
        assert!(engine.ignited_neighbors(radio).contains(&peer));

        // A second SetLinkUp for an already-ignited responder replies
        // immediately without touching the driver.
        let effects = engine.set_link_up(radio, peer, false);
        assert_eq!(effects, vec![Effect::Notify(IgnitionNotification::LinkUp { radio, responder: peer })]);

        let effects = engine.on_driver_event(DriverEvent::LinkStatus { responder: peer, status: LinkStatusType::LinkDown });
        assert!(effects.contains(&Effect::Notify(IgnitionNotification::LinkDown { radio, responder: peer })));
        assert!(!engine.ignited_neighbors(radio).contains(&peer));
    }

    #[test]
    fn wsec_path_requests_alloc_then_authorizes() {
        let (radio, peer) = radios();
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        engine.register_radio(radio, false);

        let effects = engine.set_link_up(radio, peer, true);
        assert!(effects.iter().any(|e| matches!(e, Effect::Driver { cmd: DriverCommand::DevAllocReq { .. }, .. })));

        let effects = engine.on_driver_event(DriverEvent::DevAllocRes { ifname: "terra0".into(), success: true });
        assert!(effects.iter().any(|e| matches!(e, Effect::StartAuthenticator(name) if name == "terra0")));
        assert!(effects.iter().any(|e| matches!(e, Effect::Driver { cmd: DriverCommand::SetLinkStatus { up: true, .. }, .. })));

        let effects = engine.on_driver_event(DriverEvent::LinkStatus { responder: peer, status: LinkStatusType::LinkUp });
        assert!(effects.is_empty() || !effects.iter().any(|e| matches!(e, Effect::Notify(_))));

        let effects = engine.on_driver_event(DriverEvent::WsecLinkupStatus { ifname: "terra0".into() });
        assert!(effects.contains(&Effect::Notify(IgnitionNotification::LinkAuthorized { radio, responder: peer, wsec: 1 })));
    }

    #[test]
    fn second_set_link_up_while_busy_is_dropped() {
        let (radio, peer) = radios();
        let other = RadioMac::test_mac("other");
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        engine.set_link_up(radio, peer, false);
        let effects = engine.set_link_up(radio, other, false);
        assert!(effects.is_empty());
    }

    #[test]
    fn response_wait_timeout_resets_and_signals_link_down_if_it_had_gone_up() {
        let (radio, peer) = radios();
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        engine.set_link_up(radio, peer, false);
        engine.on_driver_event(DriverEvent::LinkStatus { responder: peer, status: LinkStatusType::LinkUp });
        // Simulate it stalling before authorization would matter (wsec
        // disabled here so it's already Idle; re-enter Requesting via a
        // second radio/responder pair to exercise the timeout path).
        let third = RadioMac::test_mac("third");
        engine.set_link_up(radio, third, true);
        let effects = engine.on_timer(radio, third, TimerKind::ResponseWait);
        assert!(effects.iter().all(|e| !matches!(e, Effect::Notify(IgnitionNotification::LinkDown { .. }))));
        // cur_responder cleared, a fresh request now goes through.
        let effects = engine.set_link_up(radio, third, false);
        assert!(effects.iter().any(|e| matches!(e, Effect::Driver { cmd: DriverCommand::SetLinkStatus { .. }, .. })));
    }

    #[test]
    fn dev_up_down_synthesizes_link_down_for_every_ignited_neighbor() {
        let (radio, peer) = radios();
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        engine.set_link_up(radio, peer, false);
        engine.on_driver_event(DriverEvent::LinkStatus { responder: peer, status: LinkStatusType::LinkUp });
        let effects = engine.on_driver_event(DriverEvent::DevUpDownStatus { radio, down: true });
        assert_eq!(effects, vec![Effect::Notify(IgnitionNotification::LinkDown { radio, responder: peer })]);
        assert!(engine.ignited_neighbors(radio).is_empty());
    }

    #[test]
    fn bf_responder_mode_settle_delay_round_trips() {
        let radio = RadioMac::test_mac("self");
        let mut engine = IgnitionEngine::new(IgnitionConfig::default());
        let effects = engine.disable_bf_responder_mode(radio);
        assert!(matches!(effects[0], Effect::StartTimer { kind: TimerKind::BfResponderSettle, .. }));
        // A repeat request is a no-op while one is pending.
        assert!(engine.disable_bf_responder_mode(radio).is_empty());
        let fired = engine.on_timer(radio, RadioMac::ZERO, TimerKind::BfResponderSettle);
        assert!(!fired.is_empty());
        // Once fired, cancel-side enable finds nothing pending.
        assert!(engine.enable_bf_responder_mode(radio).is_empty());
    }
}
