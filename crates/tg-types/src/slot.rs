use serde::{Deserialize, Serialize};

/// A half-open `[start, start+len)` window within a repeating period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: u16,
    pub len: u16,
}

impl Slot {
    pub fn new(start: u16, len: u16) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> u16 {
        self.start + self.len
    }
}

/// The purpose a reserved slot window serves. Distinct from [`ScanType`](crate::ScanType):
/// a single scan type can map to different purposes depending on polarity
/// (hybrid links reserve the wider `HybridPbf` window instead of `Pbf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotPurpose {
    Im,
    Pbf,
    Rtac,
    HybridPbf,
    Nulling,
    NullingApply,
}

impl SlotPurpose {
    pub const ALL: [SlotPurpose; 6] = [
        SlotPurpose::Im,
        SlotPurpose::Pbf,
        SlotPurpose::Rtac,
        SlotPurpose::HybridPbf,
        SlotPurpose::Nulling,
        SlotPurpose::NullingApply,
    ];
}
