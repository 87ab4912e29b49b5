use tg_types::RadioMac;

use crate::error::TransportError;

/// Events the driver/firmware layer raises asynchronously into the
/// ignition engine. Bit-exact layout of the underlying netlink messages is
/// frozen at the firmware boundary and out of scope (`spec.md` §1); only
/// the logical shape each handler needs is modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// `DriverLinkStatus(LINK_UP | LINK_DOWN | LINK_PAUSE, responder)`.
    LinkStatus {
        responder: RadioMac,
        status: tg_types::LinkStatusType,
    },
    /// `DriverDevAllocRes(success, ifname)`: the interface allocation the
    /// ignition engine requested for a responder either succeeded or not.
    DevAllocRes { ifname: String, success: bool },
    /// `DriverWsecStatus(wsec, ifname)`: wsec negotiation result; `wsec ==
    /// 0` means the link settled on open mode.
    WsecStatus { ifname: String, wsec: u8 },
    /// `DriverWsecLinkupStatus(ifname)`: the 4-way handshake completed.
    WsecLinkupStatus { ifname: String },
    /// `DriverDevUpDownStatus(down)`: an entire radio went up or down,
    /// implying LINK_DOWN for every neighbor it had ignited.
    DevUpDownStatus { radio: RadioMac, down: bool },
}

/// Commands the ignition engine issues down to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    SetLinkStatus {
        responder: RadioMac,
        up: bool,
    },
    DevAllocReq {
        responder: RadioMac,
    },
}

/// The ignition engine's inbound capability: whatever owns the netlink
/// socket calls this for every event it decodes. Modeled as a trait object
/// per `spec.md` §9 ("the netlink-event handler ... modeled as trait/
/// interface values, not class hierarchies").
pub trait NetlinkEventHandler: Send + Sync {
    fn on_driver_event(&self, event: DriverEvent);
}

/// The ignition engine's outbound capability: send a command to the
/// driver for a given radio.
pub trait DriverClient: Send + Sync {
    fn send(&self, radio: RadioMac, cmd: DriverCommand) -> Result<(), TransportError>;
}
