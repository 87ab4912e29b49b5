use thiserror::Error;

/// Error kinds from `spec.md` §7 that apply to the scan orchestrator.
/// `TransientDriver`, `Timeout`, and `ConfigWriteFailed` are recorded, not
/// propagated: they describe partial-success paths the orchestrator
/// recovers from on its own (see `spec.md` §7 "recovered locally").
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unsatisfiable: {0}")]
    Unsatisfiable(#[from] tg_slotsched::SlotSchedulerError),
    #[error("unknown scan token")]
    UnknownToken,
    #[error("duplicate response for token")]
    DuplicateResponse,
}
