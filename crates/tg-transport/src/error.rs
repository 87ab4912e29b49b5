use thiserror::Error;

/// Failures from the external collaborators this crate only specifies the
/// contract for (radio delivery, driver/netlink, helper processes). The
/// wire encoding and the transport itself (ZMQ/netlink) are out of scope;
/// callers plug in a real implementation of the traits in this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("radio {0} unreachable")]
    RadioUnreachable(tg_types::RadioMac),
    #[error("driver rejected command: {0}")]
    DriverRejected(String),
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),
    #[error("failed to write config: {0}")]
    ConfigWriteFailed(String),
}
