//! Minion status report assembly (`spec.md` §6): reachability metric, BGP
//! status snapshot, node config MD5 tracking with its delayed-action rule,
//! and the `StatusReport` the periodic status loop sends to the
//! controller.

mod bgp;
mod config_md5;
mod error;
mod reachability;
mod report;

pub use bgp::{BgpPeerStatus, BgpStatusSource, NoBgp};
pub use config_md5::{ConfigMd5Tracker, NodeConfig};
pub use error::StatusError;
pub use reachability::{Reachability, DEFAULT_WINDOW};
pub use report::{NodeStatus, StatusReport, StatusReportAssembler, UpgradeStatus};
