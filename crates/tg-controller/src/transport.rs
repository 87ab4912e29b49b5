//! Default `tg-transport` implementations for the controller binary. The
//! ZMQ/broker wire transport radios actually ride on is out of scope
//! (`spec.md` §1: "wire serialization format used by radio firmware ...
//! netlink/ZMQ transport"); this crate only needs something that satisfies
//! the trait so the orchestrator can run standalone, matching how
//! `vcontrol` logs the commands it can't yet act on for capabilities it
//! hasn't wired a backend for.

use tg_transport::{ScanResultSink, ScanTransport, TransportError};
use tg_types::{RadioMac, Scan, ScanReq};

/// Logs every outbound scan command instead of delivering it over a real
/// transport. The default `ScanTransport` this binary runs with until a
/// broker/ZMQ backend is wired in.
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl ScanTransport for LoggingTransport {
    fn send_scan_req(&self, radio: RadioMac, req: ScanReq) -> Result<(), TransportError> {
        tracing::debug!(%radio, token = req.token, ?req.scan_type, start_bwgd = req.start_bwgd_idx, "scan command");
        Ok(())
    }
}

/// Logs every finished scan. Persistent storage of results is an explicit
/// non-goal (`spec.md` §1); this is the interface that replaces it.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ScanResultSink for LoggingSink {
    fn on_scan_complete(&self, scan: &Scan) {
        tracing::info!(
            scan_id = scan.scan_id,
            resp_id = scan.resp_id,
            ?scan.scan_type,
            responses = scan.responses.len(),
            timed_out = scan.timed_out,
            "scan complete"
        );
    }
}
