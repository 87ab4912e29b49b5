//! Status report assembly (`spec.md` §6): the periodic minion -> controller
//! message carrying node status, node type, per-radio GPS sync, upgrade
//! status, BGP snapshot, config MD5, firmware version, and the
//! reachability metric. Ported from `StatusApp::buildStatusReport`/
//! `reportStatus`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tg_types::{NodeType, RadioMac};

use crate::bgp::{BgpPeerStatus, BgpStatusSource};
use crate::config_md5::{ConfigMd5Tracker, NodeConfig};
use crate::error::StatusError;
use crate::reachability::{Reachability, DEFAULT_WINDOW};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Offline,
    Online,
    OnlineInitiator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeStatus {
    pub in_progress: bool,
    pub next_image_version: String,
    pub reason: String,
}

/// Wire shape of a status report. `gps_sync` is a flattened `(radio,
/// synced)` list rather than a `HashMap`, matching every other crate's
/// `Vec<(K, V)>` convention for non-string-keyed maps over JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusReport {
    pub node_status: NodeStatus,
    pub node_type: Option<NodeType>,
    pub gps_sync: Vec<(RadioMac, bool)>,
    pub upgrade_status: UpgradeStatus,
    pub bgp_status: Vec<BgpPeerStatus>,
    pub config_md5: String,
    pub firmware_version: String,
    pub node_reachability: Option<f64>,
}

/// Owns everything a status report is assembled from and builds a fresh
/// [`StatusReport`] on demand, the way `StatusApp` holds `srAckMetric_`/
/// `NodeConfigWrapper`/`bgpStatus_` as member state between report ticks.
pub struct StatusReportAssembler {
    reachability: Reachability,
    config_md5: ConfigMd5Tracker,
    node_status: NodeStatus,
    node_type: Option<NodeType>,
    upgrade_status: UpgradeStatus,
    firmware_version: String,
}

impl StatusReportAssembler {
    pub fn new(status_report_interval: Duration) -> Self {
        Self::with_window(DEFAULT_WINDOW, status_report_interval)
    }

    pub fn with_window(reachability_window: Duration, status_report_interval: Duration) -> Self {
        Self {
            reachability: Reachability::new(reachability_window, status_report_interval),
            config_md5: ConfigMd5Tracker::new(),
            node_status: NodeStatus::default(),
            node_type: None,
            upgrade_status: UpgradeStatus::default(),
            firmware_version: String::new(),
        }
    }

    pub fn set_node_status(&mut self, status: NodeStatus) {
        self.node_status = status;
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = Some(node_type);
    }

    pub fn set_upgrade_status(&mut self, status: UpgradeStatus) {
        self.upgrade_status = status;
    }

    pub fn set_firmware_version(&mut self, version: impl Into<String>) {
        self.firmware_version = version.into();
    }

    pub fn set_config(&mut self, config: &NodeConfig) -> Result<(), StatusError> {
        self.config_md5.set_config(config)
    }

    pub fn set_delayed_action_pending(&mut self, pending: bool) {
        self.config_md5.use_previous_config_md5(pending);
    }

    /// Call once per report sent, before handing it off to the transport.
    pub fn record_report_sent(&mut self) {
        self.reachability.record_request();
    }

    /// Call when the controller's ack for the most recent report arrives.
    pub fn record_report_acked(&mut self) -> bool {
        self.reachability.record_response()
    }

    pub fn build(&self, gps_sync: Vec<(RadioMac, bool)>, bgp: &dyn BgpStatusSource) -> StatusReport {
        StatusReport {
            node_status: self.node_status,
            node_type: self.node_type,
            gps_sync,
            upgrade_status: self.upgrade_status.clone(),
            bgp_status: bgp.bgp_status(),
            config_md5: self.config_md5.config_md5().to_string(),
            firmware_version: self.firmware_version.clone(),
            node_reachability: self.reachability.ack_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgp::NoBgp;

    #[test]
    fn fresh_assembler_reports_offline_and_no_reachability() {
        let assembler = StatusReportAssembler::new(Duration::from_secs(1));
        let report = assembler.build(vec![], &NoBgp);
        assert_eq!(report.node_status, NodeStatus::Offline);
        assert_eq!(report.node_reachability, None);
        assert_eq!(report.config_md5, "");
    }

    #[test]
    fn reachability_feeds_through_after_a_report_round_trip() {
        let mut assembler = StatusReportAssembler::new(Duration::from_secs(1));
        assembler.record_report_sent();
        assembler.record_report_acked();
        let report = assembler.build(vec![], &NoBgp);
        assert_eq!(report.node_reachability, Some(1.0));
    }

    #[test]
    fn gps_sync_and_node_type_pass_through() {
        let mut assembler = StatusReportAssembler::new(Duration::from_secs(1));
        assembler.set_node_type(NodeType::Dn);
        let radio = RadioMac::test_mac("a");
        let report = assembler.build(vec![(radio, true)], &NoBgp);
        assert_eq!(report.node_type, Some(NodeType::Dn));
        assert_eq!(report.gps_sync, vec![(radio, true)]);
    }
}
