//! Capability traits for the external collaborators named but not
//! implemented by `spec.md` §1: scan delivery to radios, the driver/
//! netlink event interface the ignition engine rides on, helper-process
//! spawning, and the sinks scan results and controller notifications
//! stream out through.
//!
//! Every trait here is a narrow capability, not a class hierarchy, per the
//! "inheritance / virtual dispatch" design note in `spec.md` §9: callers
//! hold `Arc<dyn Trait>` handles and never know which concrete transport
//! backs them.

mod driver;
mod error;
mod process;
mod scan;
mod sink;

pub use driver::{DriverClient, DriverCommand, DriverEvent, NetlinkEventHandler};
pub use error::TransportError;
pub use process::ProcessSpawner;
pub use scan::ScanTransport;
pub use sink::{ControllerNotifier, ScanResultSink};

#[cfg(any(test, feature = "test-util"))]
pub use scan::test_support::RecordingTransport;
#[cfg(any(test, feature = "test-util"))]
pub use sink::test_support::{RecordingNotifier, RecordingSink};
