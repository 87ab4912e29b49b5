use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tg_types::{Slot, SlotPurpose};

use crate::SlotSchedulerError;

/// Per-purpose allowed-window table inside one repeating period.
///
/// `slot_len` and `period_len` are both expressed in BWGDs; `period_len`
/// must be an exact multiple of `slot_len`. The default mirrors the
/// controller's built-in schedule (overridable at runtime via
/// [`SlotMapConfig::set`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMapConfig {
    pub slot_len: u16,
    pub period_len: u16,
    pub mapping: HashMap<SlotPurpose, Vec<Slot>>,
}

impl Default for SlotMapConfig {
    fn default() -> Self {
        let s = Slot::new;
        let mapping = HashMap::from([
            (SlotPurpose::Im, vec![s(0, 5), s(64, 5)]),
            (SlotPurpose::Pbf, vec![s(13, 5), s(77, 5)]),
            (
                SlotPurpose::Rtac,
                vec![
                    s(25, 2),
                    s(28, 2),
                    s(31, 2),
                    s(34, 2),
                    s(89, 2),
                    s(92, 2),
                    s(95, 2),
                    s(98, 2),
                ],
            ),
            (SlotPurpose::HybridPbf, vec![s(13, 10), s(77, 10)]),
            (SlotPurpose::Nulling, vec![s(38, 5), s(102, 5)]),
            (SlotPurpose::NullingApply, vec![s(58, 1), s(122, 1)]),
        ]);
        Self {
            slot_len: 16,
            period_len: 128,
            mapping,
        }
    }
}

impl SlotMapConfig {
    /// Validates that, within each purpose, slots are sorted by `start` and
    /// don't overlap. This is the same check the controller runs before
    /// accepting an operator-supplied slot map.
    pub fn validate(&self) -> Result<(), SlotSchedulerError> {
        for (purpose, slots) in &self.mapping {
            let mut prev_end: Option<u16> = None;
            for slot in slots {
                if let Some(end) = prev_end {
                    if slot.start < end {
                        return Err(SlotSchedulerError::InvalidSlotOrdering { purpose: *purpose });
                    }
                }
                prev_end = Some(slot.end());
            }
        }
        Ok(())
    }

    pub fn slots_for(&self, purpose: SlotPurpose) -> &[Slot] {
        self.mapping
            .get(&purpose)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
