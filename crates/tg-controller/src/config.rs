//! Controller binary configuration. CLI/config-file parsing proper is an
//! external collaborator (`spec.md` §1); this is just the JSON-shaped
//! config document the binary loads at startup, mirroring the node config
//! file contract of `spec.md` §6.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tg_scan::ScanConfig;
use tg_slotsched::SlotMapConfig;

use crate::topology::TopologySnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub http_bind_addr: SocketAddr,
    pub leap_seconds: i64,
    #[serde(default)]
    pub slot_map: SlotMapConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub topology: TopologySnapshot,
    /// `imScanTimeout`/`combinedScanTimeout` cadence, `spec.md` §4.F.5.
    pub im_scan_period_s: f64,
    pub combined_scan_period_s: f64,
    pub scan_max_distance_m: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let scan = ScanConfig::default();
        Self {
            http_bind_addr: "127.0.0.1:7800".parse().unwrap(),
            leap_seconds: tg_time::DEFAULT_LEAP_SECONDS,
            slot_map: SlotMapConfig::default(),
            im_scan_period_s: scan.im_scan_timeout_s,
            combined_scan_period_s: scan.combined_scan_timeout_s,
            scan_max_distance_m: tg_topology::DEFAULT_SCAN_MAX_DISTANCE_M,
            scan,
            topology: TopologySnapshot::default(),
        }
    }
}

impl ControllerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
