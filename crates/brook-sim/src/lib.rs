//! Scenario host for the coded video stream.
//!
//! Everything the library crates leave to external collaborators lives
//! here, std-only: a seeded lossy channel behind the `Datalink` seam, a
//! trace file loader, and a virtual-time event loop that plays scheduler
//! and topology for one sender/receiver pair.

#![forbid(unsafe_code)]

mod link;
mod scenario;

pub use link::{LinkConfig, LinkCounters, LossyLink};
pub use scenario::{run_scenario, ScenarioConfig, ScenarioReport};

use std::path::Path;

use anyhow::Context;
use brook_core::{parse_trace, TraceEntry};

/// Loads a plain-text trace file: one `frameId packetId payloadSize
/// txTimeSeconds layerId` line per packet.
pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace {}", path.display()))?;
    parse_trace(&text).with_context(|| format!("parsing trace {}", path.display()))
}
