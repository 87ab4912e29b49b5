use tg_types::{RadioMac, ScanReq};

use crate::error::TransportError;

/// Delivers scan commands to radios and is the sink scan responses arrive
/// through. Implemented by whatever sits on the ZMQ/broker boundary
/// (out of scope here per `spec.md` §1); the orchestrator only ever talks
/// to this trait object.
///
/// The launch protocol (`spec.md` §4.F.3) requires delivery no later than
/// `scans_start_time_offset` before the wall-clock instant the command's
/// `start_bwgd_idx` begins; callers are expected to invoke
/// [`ScanTransport::send_scan_req`] from a task timed to land inside that
/// window (see `tg-scan`'s launch scheduling, which owns the timing and
/// treats this trait as the fire-and-forget delivery step).
pub trait ScanTransport: Send + Sync {
    /// Deliver a single per-radio scan command. Each radio receives its
    /// command independently; a failure for one radio must not block
    /// delivery to the others.
    fn send_scan_req(&self, radio: RadioMac, req: ScanReq) -> Result<(), TransportError>;
}

#[cfg(any(test, feature = "test-util"))]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(RadioMac, ScanReq)>>,
    }

    impl ScanTransport for RecordingTransport {
        fn send_scan_req(&self, radio: RadioMac, req: ScanReq) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push((radio, req));
            Ok(())
        }
    }
}
