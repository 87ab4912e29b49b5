//! Scan-scheduling topology graphs: adjacency (wireless links), hearability
//! (site proximity) and their derived exclusion graph, colored so that
//! radios sharing a color may scan concurrently without interfering.

mod coloring;
mod graph;

pub use coloring::{ColorScheduler, DEFAULT_SCAN_MAX_DISTANCE_M};
pub use graph::Graph;
