//! Shared wire- and domain-model types for the Terragraph scan/ignition core.
//!
//! These types are intentionally plain data: validation and behavior live in
//! the crates that own each subsystem (`tg-scan`, `tg-slotsched`,
//! `tg-ignition`, ...). Keeping them here avoids every subsystem crate
//! depending on every other one just to pass a `RadioMac` around.

mod mac;
mod message;
mod scan;
mod slot;
mod topology;

pub use mac::{MacParseError, RadioMac};
pub use message::{LinkStatusType, MessageEnvelope, MessageType, RoutedMessage};
pub use scan::{
    BeamInfo, BeamRange, GroupId, RespId, RouteInfo, Scan, ScanFwStatus, ScanId, ScanMode,
    ScanReq, ScanResp, ScanSubType, ScanToken, ScanType, StartScanRequest, TopoInfo,
};
pub use slot::{Slot, SlotPurpose};
pub use topology::{
    is_valid_link_polarity, Link, LinkType, Location, Node, NodeType, PolarityType, Site,
    TopologyView,
};
