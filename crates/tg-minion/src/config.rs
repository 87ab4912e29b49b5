//! Minion binary configuration. Mirrors the node config file contract of
//! `spec.md` §6 and `original_source/`'s `NodeConfigWrapper.h`: CLI/file
//! parsing proper stays an external collaborator, but the JSON-shaped
//! document the binary loads at startup is implemented here.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tg_types::{NodeType, RadioMac};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    pub mac: RadioMac,
    pub ifname: String,
    pub is_cn: bool,
    /// This radio's color in the DN-to-DN self-ignition schedule
    /// (`spec.md` §4.H); meaningless if `distributed_candidates` is empty.
    pub color: u32,
    pub distributed_candidates: Vec<RadioMac>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinionConfig {
    pub http_bind_addr: SocketAddr,
    pub leap_seconds: i64,
    pub node_name: String,
    pub node_type: NodeType,
    pub firmware_version: String,
    pub ibf_number_of_beams: u32,
    pub num_colors: u32,
    pub radios: Vec<RadioConfig>,
    pub all_ifnames: Vec<String>,

    pub status_report_interval_s: f64,
    pub continuous_topo_scan_duration_s: f64,

    pub linkup_resp_wait_timeout_s: f64,
    pub link_pause_dissoc_delay_s: f64,
    pub bf_responder_settle_delay_s: f64,

    pub distributed_cooldown_s: f64,
    pub distributed_max_offset_s: f64,
    pub distributed_attempts_before_backoff: u32,
    pub distributed_max_attempts: u32,
}

impl Default for MinionConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:7810".parse().unwrap(),
            leap_seconds: tg_time::DEFAULT_LEAP_SECONDS,
            node_name: String::new(),
            node_type: NodeType::Dn,
            firmware_version: String::new(),
            ibf_number_of_beams: 8,
            num_colors: 2,
            radios: Vec::new(),
            all_ifnames: Vec::new(),

            status_report_interval_s: 1.0,
            continuous_topo_scan_duration_s: 0.0,

            linkup_resp_wait_timeout_s: tg_ignition::DEFAULT_LINKUP_RESP_WAIT_TIMEOUT.as_secs_f64(),
            link_pause_dissoc_delay_s: tg_ignition::DEFAULT_LINK_PAUSE_DISSOC_DELAY.as_secs_f64(),
            bf_responder_settle_delay_s: tg_ignition::DEFAULT_BF_RESPONDER_SETTLE_DELAY.as_secs_f64(),

            distributed_cooldown_s: 5.0,
            distributed_max_offset_s: 1.0,
            distributed_attempts_before_backoff: 3,
            distributed_max_attempts: 18,
        }
    }
}

impl MinionConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
