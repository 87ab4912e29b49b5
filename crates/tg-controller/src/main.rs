//! `tg-controller`: the E2E scan orchestrator described in `spec.md` §4.F —
//! owns the slot scheduler, the topology view, and the scan state machine,
//! and drives the periodic IM/combined scan loops of §4.F.5.
//!
//! Config loading, transport, and HTTP setup follow `vinit::main`'s shape:
//! parse args, initialize tracing, spawn the long-running actors, serve.

mod actor;
mod config;
mod error;
mod http;
mod topology;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use actor::ControllerHandle;
use config::ControllerConfig;
use tg_slotsched::SlotSchedulerHandle;
use topology::TopologyStore;
use transport::{LoggingSink, LoggingTransport};

#[derive(Parser, Debug)]
#[command(name = "tg-controller", about = "Terragraph E2E scan/slot controller")]
struct Args {
    /// Path to a JSON `ControllerConfig` document. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };

    let slotsched = SlotSchedulerHandle::spawn(cfg.slot_map.clone(), cfg.leap_seconds);
    let topology = TopologyStore::new(cfg.topology.clone());
    let transport = Arc::new(LoggingTransport);
    let sink = Arc::new(LoggingSink);

    let controller = ControllerHandle::spawn(
        cfg.scan.clone(),
        slotsched,
        transport,
        sink,
        topology,
        cfg.scan_max_distance_m,
        Duration::from_secs_f64(cfg.im_scan_period_s),
        Duration::from_secs_f64(cfg.combined_scan_period_s),
    );

    http::serve(cfg.http_bind_addr, controller).await
}
