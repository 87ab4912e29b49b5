use std::time::Duration;

use tg_types::{RadioMac, SlotPurpose};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::SlotMapConfig;
use crate::scheduler::{SlotScheduler, SlotSchedulerError};

/// Start scheduling cleanups at least this often.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);
/// Cleanup reservations for periods up to this many seconds in the past.
const CLEANUP_SAFETY_MARGIN_SECS: f64 = 5.0;

enum Command {
    AdjustBwgd {
        purpose: SlotPurpose,
        bwgd: u64,
        len: u32,
        tx: RadioMac,
        rxs: Vec<RadioMac>,
        reply: oneshot::Sender<Result<u64, SlotSchedulerError>>,
    },
    GetConfig {
        reply: oneshot::Sender<SlotMapConfig>,
    },
    SetConfig {
        config: SlotMapConfig,
        reply: oneshot::Sender<Result<(), SlotSchedulerError>>,
    },
}

/// A cloneable handle to a [`SlotScheduler`] running on its own task.
///
/// Mirrors the controller app pattern: one mailbox per app, single-threaded
/// ownership of mutable state, callers talk to it only through message
/// passing and a one-shot reply channel.
#[derive(Clone)]
pub struct SlotSchedulerHandle {
    tx: mpsc::Sender<Command>,
}

impl SlotSchedulerHandle {
    pub fn spawn(config: SlotMapConfig, leap_seconds: i64) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run(config, leap_seconds, rx));
        Self { tx }
    }

    pub async fn adjust_bwgd(
        &self,
        purpose: SlotPurpose,
        bwgd: u64,
        len: u32,
        tx: RadioMac,
        rxs: Vec<RadioMac>,
    ) -> Result<u64, SlotSchedulerError> {
        let (reply, recv) = oneshot::channel();
        let _ = self
            .tx
            .send(Command::AdjustBwgd {
                purpose,
                bwgd,
                len,
                tx,
                rxs,
                reply,
            })
            .await;
        recv.await.unwrap_or(Err(SlotSchedulerError::NoSlotLargeEnough {
            purpose,
            len_units: 0,
        }))
    }

    pub async fn get_config(&self) -> Option<SlotMapConfig> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::GetConfig { reply }).await;
        recv.await.ok()
    }

    pub async fn set_config(&self, config: SlotMapConfig) -> Result<(), SlotSchedulerError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::SetConfig { config, reply }).await;
        recv.await
            .unwrap_or(Err(SlotSchedulerError::InvalidSlotOrdering {
                purpose: SlotPurpose::Im,
            }))
    }
}

async fn run(config: SlotMapConfig, leap_seconds: i64, mut rx: mpsc::Receiver<Command>) {
    let mut scheduler = SlotScheduler::new(config);
    let mut cleanup = tokio::time::interval(CLEANUP_INTERVAL);
    cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    Some(Command::AdjustBwgd { purpose, bwgd, len, tx, rxs, reply }) => {
                        let res = scheduler.adjust_bwgd(purpose, bwgd, len, tx, &rxs);
                        if let Err(ref e) = res {
                            tracing::warn!(?purpose, error = %e, "adjust_bwgd failed");
                        }
                        let _ = reply.send(res);
                    }
                    Some(Command::GetConfig { reply }) => {
                        let _ = reply.send(scheduler.config().clone());
                    }
                    Some(Command::SetConfig { config, reply }) => {
                        let res = scheduler.set_config(config);
                        let _ = reply.send(res);
                    }
                    None => break,
                }
            }
            _ = cleanup.tick() => {
                let now = tg_time::unix_now_secs();
                scheduler.cleanup(now, CLEANUP_SAFETY_MARGIN_SECS, leap_seconds);
                tracing::trace!("slot map cleanup tick");
            }
        }
    }
}
