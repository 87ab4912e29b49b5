//! `tg-minion`: the per-node ignition engine described in `spec.md` §4.G-I —
//! owns the association state machine, distributed self-ignition, the
//! continuous topology-scan loop, and the status-report assembler.
//!
//! Config loading, transport, and HTTP setup follow `vinit::main`'s shape,
//! the same as `tg-controller::main`: parse args, initialize tracing, spawn
//! the long-running actor, serve.

mod actor;
mod config;
mod error;
mod http;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use actor::MinionHandle;
use config::MinionConfig;
use transport::{LoggingControllerNotifier, LoggingDriverClient, LoggingProcessSpawner, LoggingScanTransport};

#[derive(Parser, Debug)]
#[command(name = "tg-minion", about = "Terragraph minion ignition engine")]
struct Args {
    /// Path to a JSON `MinionConfig` document. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => MinionConfig::load(path)?,
        None => MinionConfig::default(),
    };

    let driver = Arc::new(LoggingDriverClient);
    let spawner = Arc::new(LoggingProcessSpawner);
    let notifier = Arc::new(LoggingControllerNotifier);
    let scan_transport = Arc::new(LoggingScanTransport);

    let http_bind_addr = cfg.http_bind_addr;
    let minion = MinionHandle::spawn(cfg, driver, spawner, notifier, scan_transport);

    http::serve(http_bind_addr, minion).await
}
