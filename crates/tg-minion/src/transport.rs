//! Default `tg-transport` implementations for the minion binary. The
//! netlink socket, wsec helper processes, and ZMQ/broker transport are all
//! external collaborators (`spec.md` §1); these log the commands the
//! ignition engine and status loop issue, matching `LoggingTransport` in
//! `tg-controller`.

use tg_transport::{ControllerNotifier, DriverClient, DriverCommand, ProcessSpawner, ScanTransport, TransportError};
use tg_types::{MessageEnvelope, RadioMac, ScanReq};

#[derive(Debug, Default)]
pub struct LoggingDriverClient;

impl DriverClient for LoggingDriverClient {
    fn send(&self, radio: RadioMac, cmd: DriverCommand) -> Result<(), TransportError> {
        tracing::debug!(%radio, ?cmd, "driver command");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoggingProcessSpawner;

impl ProcessSpawner for LoggingProcessSpawner {
    fn start_authenticator(&self, ifname: &str) -> Result<(), TransportError> {
        tracing::debug!(ifname, "start authenticator");
        Ok(())
    }

    fn kill_authenticator(&self, ifname: &str) {
        tracing::debug!(ifname, "kill authenticator");
    }

    fn start_supplicant(&self, ifname: &str) -> Result<(), TransportError> {
        tracing::debug!(ifname, "start supplicant");
        Ok(())
    }

    fn kill_supplicant(&self, ifname: &str) {
        tracing::debug!(ifname, "kill supplicant");
    }
}

#[derive(Debug, Default)]
pub struct LoggingControllerNotifier;

impl ControllerNotifier for LoggingControllerNotifier {
    fn notify(&self, envelope: MessageEnvelope) {
        tracing::debug!(?envelope.m_type, bytes = envelope.value.len(), "notify controller");
    }
}

#[derive(Debug, Default)]
pub struct LoggingScanTransport;

impl ScanTransport for LoggingScanTransport {
    fn send_scan_req(&self, radio: RadioMac, req: ScanReq) -> Result<(), TransportError> {
        tracing::debug!(%radio, token = req.token, ?req.scan_type, start_bwgd = req.start_bwgd_idx, "local scan command");
        Ok(())
    }
}
