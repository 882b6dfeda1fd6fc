//! Video trace model.
//!
//! A trace is the list of packets a source emits for a clip, one line per
//! packet: `frameId packetId payloadSize txTimeSeconds layerId`. Entries
//! sharing a `frameId` belong to one video frame and are coded together.

use alloc::vec::Vec;

use crate::{BrookError, BrookResult};

/// One packet of the source clip as recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub frame_id: u32,
    pub packet_id: u32,
    pub payload_size: u16,
    /// Recorded emission gap in microseconds. The planner replaces this
    /// with the generation pacing interval.
    pub interval_us: u64,
    /// 0 for the base layer, higher values for enhancement layers.
    pub layer_id: u8,
}

/// Two-frame clip used whenever no trace file is supplied.
const DEFAULT_ENTRIES: [TraceEntry; 11] = [
    TraceEntry { frame_id: 1, packet_id: 2, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 3, payload_size: 1402, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 4, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 5, payload_size: 308, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 6, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 7, payload_size: 1277, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 1, packet_id: 8, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 2, packet_id: 9, payload_size: 973, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 2, packet_id: 10, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 2, packet_id: 11, payload_size: 1376, interval_us: 1_000_000, layer_id: 0 },
    TraceEntry { frame_id: 2, packet_id: 12, payload_size: 9, interval_us: 1_000_000, layer_id: 0 },
];

/// Returns the built-in default clip.
pub fn default_trace() -> Vec<TraceEntry> {
    DEFAULT_ENTRIES.to_vec()
}

impl TraceEntry {
    /// Parses one trace line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> BrookResult<Option<TraceEntry>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let mut fields = line.split_whitespace();
        let frame_id = next_field::<u32>(&mut fields)?;
        let packet_id = next_field::<u32>(&mut fields)?;
        let payload_size = next_field::<u16>(&mut fields)?;
        let tx_time_s = next_field::<f64>(&mut fields)?;
        let layer_id = next_field::<u8>(&mut fields)?;
        if fields.next().is_some() {
            return Err(BrookError::Configuration);
        }
        if !tx_time_s.is_finite() || tx_time_s < 0.0 {
            return Err(BrookError::Configuration);
        }
        Ok(Some(TraceEntry {
            frame_id,
            packet_id,
            payload_size,
            interval_us: (tx_time_s * 1_000_000.0) as u64,
            layer_id,
        }))
    }
}

fn next_field<T: core::str::FromStr>(fields: &mut core::str::SplitWhitespace<'_>) -> BrookResult<T> {
    fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or(BrookError::Configuration)
}

/// Parses a whole trace file. An empty result is legal here; the stream
/// rejects it at start instead.
pub fn parse_trace(text: &str) -> BrookResult<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for line in text.lines() {
        if let Some(entry) = TraceEntry::parse_line(line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}
