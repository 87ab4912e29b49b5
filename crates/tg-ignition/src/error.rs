use thiserror::Error;

use tg_types::RadioMac;

/// Error kinds surfaced by the ignition engine (`spec.md` §7). The state
/// machine itself never fails on expected inputs (a second `SetLinkUp`
/// while busy silently no-ops, per the exclusivity invariant); these are
/// for the handful of operations that can be asked of an unknown radio.
#[derive(Debug, Error)]
pub enum IgnitionError {
    #[error("radio {0} is not configured on this node")]
    UnknownRadio(RadioMac),
}
