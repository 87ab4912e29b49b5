//! Minion-side ignition: the per-radio set-link-up/driver-event state
//! machine (`spec.md` §4.G), distributed (self) ignition while
//! disconnected from the controller (§4.H), and the continuous topology
//! scan loop (§4.I).

mod distributed;
mod engine;
mod error;
mod topo_scan;

pub use distributed::{DistributedIgnition, DistributedIgnitionConfig};
pub use engine::{
    Effect, IgnitionConfig, IgnitionEngine, IgnitionNotification, TimerKind,
    DEFAULT_BF_RESPONDER_SETTLE_DELAY, DEFAULT_LINKUP_RESP_WAIT_TIMEOUT, DEFAULT_LINK_PAUSE_DISSOC_DELAY,
};
pub use error::IgnitionError;
pub use topo_scan::{bwgd_delta, ContinuousTopoScan, TopoScanAction};
