//! Controller-side scan orchestration: validates `StartScan` requests,
//! reserves airtime through the slot scheduler, dispatches per-radio
//! commands, and runs the type-specific post-processing (PBF, IM, rel-IM,
//! CBF, TOPO) that feeds RF state, CBF configuration, and LA/TPC back into
//! the controller.

mod aggregate;
mod cbf;
mod config;
mod duration;
mod error;
mod launch;
mod latpc;
mod nulling;
mod orchestrator;
mod periodic;
mod store;
mod validate;
mod watchdog;

pub use aggregate::PostProcessOutcome;
pub use cbf::{CbfAuxCandidate, CbfScanPlan};
pub use config::{mcs_to_snr, ScanConfig};
pub use error::ScanError;
pub use launch::{launch, ScanLaunchRequest, LaunchPlan};
pub use latpc::{update_max_mcs, MaxMcsTable};
pub use nulling::{select_nulling_beam, NullingResult};
pub use orchestrator::ScanOrchestrator;
pub use periodic::{im_scan_plan_for_group, im_scan_targets};
pub use store::{Completion, ScanStatusFilter, ScanStore};
pub use validate::{validate, ValidatedRequest};
pub use watchdog::SkewWatchdog;
