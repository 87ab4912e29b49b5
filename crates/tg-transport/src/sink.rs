use tg_types::{MessageEnvelope, Scan};

/// Where finished scans stream out to. Persistent storage of scan results
/// is an explicit non-goal (`spec.md` §1); this is the interface that
/// replaces it, letting a caller wire in a stats pipeline, a log sink, or
/// nothing at all.
pub trait ScanResultSink: Send + Sync {
    fn on_scan_complete(&self, scan: &Scan);
}

/// Outbound channel from a node-resident subsystem (ignition, status) back
/// to the controller.
pub trait ControllerNotifier: Send + Sync {
    fn notify(&self, envelope: MessageEnvelope);
}

#[cfg(any(test, feature = "test-util"))]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingSink {
        pub scans: Mutex<Vec<Scan>>,
    }

    impl ScanResultSink for RecordingSink {
        fn on_scan_complete(&self, scan: &Scan) {
            self.scans.lock().unwrap().push(scan.clone());
        }
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<MessageEnvelope>>,
    }

    impl ControllerNotifier for RecordingNotifier {
        fn notify(&self, envelope: MessageEnvelope) {
            self.sent.lock().unwrap().push(envelope);
        }
    }
}
