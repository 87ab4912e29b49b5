use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tg_types::RadioMac;

/// `(tx, rx)` identifies a directed wireless link by its radio MACs.
pub type LinkKey = (RadioMac, RadioMac);
/// `(txBeam, rxBeam)`. The original packs this into a single `i32`
/// (`rxBeam << 16 | txBeam`), which silently assumes 8- or 16-bit beams; a
/// plain tuple key sidesteps that assumption entirely (fixed to 16-bit
/// beams either way, since `txBeam`/`rxBeam` are `i16`).
pub type BeamKey = (i16, i16);

/// The minimum signal-to-noise ratio reported, used as the starting point
/// when searching for the best route.
pub const SCAN_SNR_MIN: f32 = -1000.0;

/// PBF-derived steady-state beam/power selection for one directed link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfLinkState {
    pub tx_beam: i16,
    pub rx_beam: i16,
    pub tx_power: i16,
}

/// Per-link IM scan aggregate: averaged SNR offset for every observed beam
/// pair, plus the best pair found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfImData {
    pub scan_id: u64,
    pub scan_power: i16,
    pub best_tx_beam: Option<i16>,
    pub best_rx_beam: Option<i16>,
    pub routes: HashMap<BeamKey, f32>,
}

impl RfImData {
    pub fn new(scan_id: u64, scan_power: i16) -> Self {
        Self {
            scan_id,
            scan_power,
            best_tx_beam: None,
            best_rx_beam: None,
            routes: HashMap::new(),
        }
    }
}

/// Relative-IM scan aggregate: cross-link SNR offsets keyed by the
/// candidate victim link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfRelImData {
    pub scan_id: u64,
    pub scan_power: i16,
    pub routes: HashMap<LinkKey, f32>,
}

impl RfRelImData {
    pub fn new(scan_id: u64, scan_power: i16) -> Self {
        Self {
            scan_id,
            scan_power,
            routes: HashMap::new(),
        }
    }
}
