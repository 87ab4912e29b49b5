use tg_types::{ScanMode, ScanType};
use tg_types::SlotPurpose;

/// `scanDurationBwgd` from `spec.md` §4.F.3: how many BWGDs a scan of the
/// given mode occupies, before any hybrid doubling is applied.
pub fn scan_duration_bwgd(mode: ScanMode, bwgd_len: Option<u32>) -> u32 {
    match mode {
        ScanMode::Coarse => 28,
        ScanMode::Fine | ScanMode::AutoPbf => 76,
        ScanMode::Selective | ScanMode::Relative => bwgd_len.unwrap_or(0) + 12,
    }
}

/// Maps a scan type (plus whether the link is hybrid-polarity) to the slot
/// purpose the scheduler reserves against.
pub fn purpose_for(scan_type: ScanType, is_hybrid_link: bool) -> SlotPurpose {
    match scan_type {
        ScanType::Im => SlotPurpose::Im,
        ScanType::Pbf | ScanType::TestUpdAwv if is_hybrid_link => SlotPurpose::HybridPbf,
        ScanType::Pbf | ScanType::TestUpdAwv => SlotPurpose::Pbf,
        ScanType::Rtcal => SlotPurpose::Rtac,
        ScanType::CbfTx | ScanType::CbfRx => SlotPurpose::Nulling,
        ScanType::Topo => SlotPurpose::Im,
    }
}

/// Reserved length in BWGDs, doubled for hybrid links per the launch
/// protocol step 1.
pub fn reserved_len_bwgd(mode: ScanMode, bwgd_len: Option<u32>, is_hybrid_link: bool) -> u32 {
    let base = scan_duration_bwgd(mode, bwgd_len);
    if is_hybrid_link {
        base * 2
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_per_mode() {
        assert_eq!(scan_duration_bwgd(ScanMode::Coarse, None), 28);
        assert_eq!(scan_duration_bwgd(ScanMode::Fine, None), 76);
        assert_eq!(scan_duration_bwgd(ScanMode::Selective, Some(4)), 16);
        assert_eq!(scan_duration_bwgd(ScanMode::Relative, Some(8)), 20);
    }

    #[test]
    fn hybrid_doubles_reserved_length() {
        assert_eq!(reserved_len_bwgd(ScanMode::Coarse, None, false), 28);
        assert_eq!(reserved_len_bwgd(ScanMode::Coarse, None, true), 56);
    }
}
