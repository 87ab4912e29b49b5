use crate::mac::RadioMac;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ScanId = u64;
pub type GroupId = u64;
pub type RespId = u64;
pub type ScanToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanType {
    Pbf,
    Im,
    Rtcal,
    CbfTx,
    CbfRx,
    Topo,
    TestUpdAwv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanMode {
    Coarse,
    Fine,
    Selective,
    Relative,
    AutoPbf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanSubType {
    RtcalTop,
    RtcalBottom,
    RtcalVbs,
    TxCbfAggressor,
    TxCbfVictim,
    RxCbfAggressor,
    RxCbfVictim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanFwStatus {
    Complete,
    InvalidType,
    InvalidStartTsf,
    AwvInProg,
    ReqBufferFull,
    LinkShutDown,
    ExpiredTsf,
    Unknown(u8),
}

impl ScanFwStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanFwStatus::Complete)
    }
}

/// A beamforming index range, `low <= high`, each in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamRange {
    pub low: u16,
    pub high: u16,
}

impl BeamRange {
    pub fn is_valid(&self) -> bool {
        self.low <= 255 && self.high <= 255 && self.low <= self.high
    }
}

/// A single route measurement: the beam pair used, and the resulting SNR.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteInfo {
    pub tx_beam: i16,
    pub rx_beam: i16,
    pub snr_est: f32,
    pub packet_idx: u8,
    pub sweep_idx: u16,
}

/// One peer's beam selection, used by relative-IM ingestion to partition
/// routes by beam.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeamInfo {
    pub addr: RadioMac,
    pub beam: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopoInfo {
    pub responder_info: Vec<RadioMac>,
}

/// A response to a single `ScanReq`, from a single radio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResp {
    pub token: ScanToken,
    pub status: ScanFwStatus,
    pub cur_superframe_num: u64,
    pub tx_pwr_index: Option<i16>,
    pub azimuth_beam: Option<i16>,
    pub old_beam: Option<i16>,
    pub new_beam: Option<i16>,
    pub route_info_list: Vec<RouteInfo>,
    pub beam_info_list: Option<Vec<BeamInfo>>,
    pub topo_info: Option<TopoInfo>,
}

impl ScanResp {
    pub fn minimal(token: ScanToken, status: ScanFwStatus, cur_superframe_num: u64) -> Self {
        Self {
            token,
            status,
            cur_superframe_num,
            tx_pwr_index: None,
            azimuth_beam: None,
            old_beam: None,
            new_beam: None,
            route_info_list: Vec::new(),
            beam_info_list: None,
            topo_info: None,
        }
    }
}

/// A scan record owned by the orchestrator from acceptance until eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub scan_id: ScanId,
    pub group_id: Option<GroupId>,
    pub scan_type: ScanType,
    pub scan_mode: ScanMode,
    pub sub_type: Option<ScanSubType>,
    pub tx_node: Option<RadioMac>,
    pub rx_nodes: Vec<RadioMac>,
    pub start_bwgd: u64,
    pub apply_bwgd: Option<u64>,
    pub apply: Option<bool>,
    pub bwgd_len: Option<u32>,
    pub beams: Option<Vec<BeamRange>>,
    pub responses: HashMap<RadioMac, ScanResp>,
    pub n_responses_waiting: u32,
    pub resp_id: Option<RespId>,
    pub timed_out: bool,
}

impl Scan {
    pub fn is_complete(&self) -> bool {
        self.n_responses_waiting == 0
    }
}

/// External request to start a scan (`StartScan` in the spec).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartScanRequest {
    pub scan_type: Option<ScanType>,
    pub scan_mode: Option<ScanMode>,
    pub sub_type: Option<ScanSubType>,
    pub start_time: Option<f64>,
    pub tx_node: Option<RadioMac>,
    pub rx_nodes: Option<Vec<RadioMac>>,
    pub beams: Option<Vec<BeamRange>>,
    pub bwgd_len: Option<u32>,
    pub apply: Option<bool>,
    pub main_tx_node: Option<RadioMac>,
    pub main_rx_node: Option<RadioMac>,
    pub aux_tx_nodes: Option<Vec<RadioMac>>,
    pub aux_rx_nodes: Option<Vec<RadioMac>>,
    pub tx_pwr_index: Option<i16>,
    pub aux_tx_pwr_index: Option<Vec<i16>>,
    pub null_angle: Option<f32>,
    pub cbf_beam_idx: Option<i16>,
    pub apply_bwgd_idx: Option<u64>,
    pub set_config: Option<bool>,
}

/// Command sent down to a single radio (`ScanReq`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReq {
    pub token: ScanToken,
    pub scan_type: ScanType,
    pub scan_mode: ScanMode,
    pub sub_type: Option<ScanSubType>,
    pub start_bwgd_idx: u64,
    pub bwgd_len: Option<u32>,
    pub beams: Option<Vec<BeamRange>>,
    pub rx_node_mac: Option<RadioMac>,
    pub tx_node_mac: Option<RadioMac>,
    pub radio_mac: RadioMac,
    pub apply: Option<bool>,
    pub bf_scan_invert_polarity: bool,
    pub tx_pwr_index: Option<i16>,
    pub null_angle: Option<f32>,
    pub cbf_beam_idx: Option<i16>,
}
