//! BGP status snapshot carried in the minion status report
//! (`SPEC_FULL.md` §11, ported from `BgpUtils.*`). The actual BGP probing
//! stays an external collaborator; this only models the snapshot shape and
//! the trait that supplies it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpPeerStatus {
    pub peer_addr: String,
    pub state: String,
    pub uptime_s: u64,
}

/// Whatever polls `bgpd`/`bird`/etc. implements this; the status assembler
/// only calls it once per report.
pub trait BgpStatusSource: Send + Sync {
    fn bgp_status(&self) -> Vec<BgpPeerStatus>;
}

/// A source with nothing to report, for nodes without BGP configured.
pub struct NoBgp;

impl BgpStatusSource for NoBgp {
    fn bgp_status(&self) -> Vec<BgpPeerStatus> {
        Vec::new()
    }
}
