use serde::{Deserialize, Serialize};

/// Logical message kind carried in an envelope. The wire encoding of the
/// payload bytes is frozen at the firmware/broker boundary and out of scope;
/// only the envelope shape and the kinds this core subsystem cares about are
/// modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    StartScan,
    StartScanResp,
    GetScanStatus,
    ScanStatus,
    ResetScanStatus,
    GetRfState,
    SetRfState,
    ResetRfState,
    SetLaTpcParams,
    GetCbfConfig,
    SetCbfConfig,
    ResetCbfConfig,
    ScanReq,
    ScanResp,
    SetLinkStatus,
    LinkStatus,
    LinkAuthorized,
    GetLinkStatus,
    GetLinkStatusDump,
    DriverSetLinkStatus,
    DriverLinkStatus,
    DriverDevAllocReq,
    DriverDevAllocRes,
    DriverWsecStatus,
    DriverWsecLinkupStatus,
    DriverDevUpDownStatus,
    BfRespScan,
    BfRespScanDisable,
    BfSlotExclusionReq,
    StartContinuousTopoScan,
    GpsEnabled,
    ControllerConnected,
    StatusReport,
    StatusReportAck,
}

/// On-the-wire envelope used on all control channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub m_type: MessageType,
    pub value: Vec<u8>,
}

/// Routing frame wrapped around an envelope between controller and node
/// brokers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedMessage {
    pub minion_id: String,
    pub receiver_app: String,
    pub sender_app: String,
    pub payload: MessageEnvelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatusType {
    LinkUp,
    LinkDown,
    LinkPause,
}
