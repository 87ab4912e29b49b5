use tg_rfstate::RfStateStore;
use tg_types::{RadioMac, Scan, ScanType, TopologyView};

use crate::config::ScanConfig;
use crate::nulling::{select_nulling_beam, NullingResult};

/// Outcome of dispatching a single completed scan's type-specific
/// post-processing (`spec.md` §4.F.4: "dispatches type-specific
/// post-processing (PBF, IM, rel-IM, CBF, TOPO)").
#[derive(Debug, Clone, PartialEq)]
pub enum PostProcessOutcome {
    Pbf { ingested: bool },
    Im { updated: usize },
    RelIm { updated: usize },
    Cbf { nulling: Option<NullingResult> },
    Topo { responders: Vec<RadioMac> },
    None,
}

/// Runs the post-processing step appropriate to `scan.scan_type` against a
/// just-completed (or just-timed-out) scan. TX/RX CBF uses whichever
/// radio's responses carry the sweep's `routeInfoList`; in a real scan
/// that's the main radio the sweep was scheduled on.
pub fn postprocess(scan: &Scan, rfstate: &mut RfStateStore, topo: &dyn TopologyView, cfg: &ScanConfig) -> PostProcessOutcome {
    match scan.scan_type {
        ScanType::Pbf | ScanType::TestUpdAwv => PostProcessOutcome::Pbf {
            ingested: rfstate.ingest_pbf(scan),
        },
        ScanType::Im => {
            if scan.apply.unwrap_or(false) {
                PostProcessOutcome::RelIm {
                    updated: rfstate.ingest_rel_im(scan, topo),
                }
            } else {
                PostProcessOutcome::Im {
                    updated: rfstate.ingest_im(scan, false),
                }
            }
        }
        ScanType::Rtcal => PostProcessOutcome::None,
        ScanType::CbfTx | ScanType::CbfRx => {
            let routes: Vec<_> = scan
                .responses
                .values()
                .flat_map(|r| r.route_info_list.iter().copied())
                .collect();
            let nulling = select_nulling_beam(&routes, scan.scan_type, cfg);
            PostProcessOutcome::Cbf { nulling }
        }
        ScanType::Topo => {
            let responders = scan
                .responses
                .values()
                .filter_map(|r| r.topo_info.as_ref())
                .flat_map(|info| info.responder_info.iter().copied())
                .collect();
            PostProcessOutcome::Topo { responders }
        }
    }
}
