//! Slot scheduler: assigns scan and link operations a conflict-free BWGD
//! within a repeating, purpose-partitioned period.
//!
//! Runs as a single-owner actor (see [`SlotSchedulerHandle`]) so that the
//! many concurrent callers across the scan orchestrator and ignition engine
//! serialize through one mailbox instead of sharing a lock.

mod actor;
mod config;
mod scheduler;

pub use actor::SlotSchedulerHandle;
pub use config::SlotMapConfig;
pub use scheduler::{SlotScheduler, SlotSchedulerError};
