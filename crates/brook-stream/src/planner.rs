//! Generation planning.
//!
//! A generation covers exactly one video frame: the planner scans the trace
//! forward while entries share the first entry's frame id, fragments each
//! payload to the MTU, and sizes the redundancy and pacing from the
//! configured overhead and frame rate. The planner holds no stream state;
//! the sender asks for a new plan at every generation boundary.

use alloc::vec::Vec;

use brook_core::wire::{frame_suffix_len, PacketLayout};
use brook_core::{BrookError, BrookResult, TraceEntry, MAX_GENERATION_SYMBOLS};

/// Stream-wide knobs shared by sender and planner.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Link MTU for the coded symbol slot. Also the symbol size.
    pub mtu: usize,
    /// Redundancy fraction. 0.25 sends one extra coded packet per four
    /// source symbols. Zero disables redundancy but not full coding.
    pub overhead: f64,
    /// Target video frame rate, frames per second.
    pub frame_rate: f64,
    /// Total frames in the clip. Sets the frame-id suffix width.
    pub total_frames: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mtu: 1400,
            overhead: 0.0,
            frame_rate: 60.0,
            total_frames: 600,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> BrookResult<()> {
        if self.mtu == 0 || self.total_frames == 0 {
            return Err(BrookError::Configuration);
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(BrookError::Configuration);
        }
        if !self.overhead.is_finite() || self.overhead < 0.0 {
            return Err(BrookError::Configuration);
        }
        Ok(())
    }

    /// Wire width of the frame-id suffix for this clip.
    pub fn suffix_len(&self) -> usize {
        frame_suffix_len(self.total_frames)
    }
}

/// One generation, fully sized. Immutable once planned.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    /// Monotone generation number; its low 8 bits are the wire tag.
    pub sequence: u64,
    pub frame_id: u32,
    /// Trace index of the frame's first entry.
    pub first_entry: usize,
    /// Trace entries covered, scanning forward (and wrapping) from
    /// `first_entry`.
    pub entry_count: usize,
    /// Fragments the frame splits into; the coding dimension.
    pub symbol_count: usize,
    /// Always the MTU.
    pub symbol_size: usize,
    /// Coded packets to transmit: source symbols plus redundancy.
    pub tx_packets: usize,
    /// Pacing gap between consecutive packets of this generation.
    pub interval_us: u64,
    /// Trace packet id backing each transmission. Redundant packets
    /// reuse the last fragment's id.
    pub packet_ids: Vec<u32>,
}

impl GenerationPlan {
    pub fn redundancy(&self) -> usize {
        self.tx_packets - self.symbol_count
    }

    /// Source block length the codec must be seeded with.
    pub fn block_len(&self) -> usize {
        self.symbol_count * self.symbol_size
    }

    pub fn tag(&self) -> u8 {
        (self.sequence & 0xFF) as u8
    }

    pub fn layout(&self, suffix_len: usize) -> PacketLayout {
        PacketLayout {
            symbol_size: self.symbol_size,
            symbol_count: self.symbol_count,
            suffix_len,
        }
    }
}

/// ceil(symbols * (1 + overhead)) without leaving core.
fn ceil_tx_packets(symbols: usize, overhead: f64) -> usize {
    let exact = symbols as f64 * (1.0 + overhead);
    let mut tx = exact as usize;
    if (tx as f64) < exact {
        tx += 1;
    }
    tx
}

/// Derives generation boundaries, fragment counts and pacing from a trace.
#[derive(Debug, Clone)]
pub struct GenerationPlanner {
    config: StreamConfig,
}

impl GenerationPlanner {
    pub fn new(config: StreamConfig) -> BrookResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Plans the generation starting at `first_entry`. The scan wraps past
    /// the end of the trace but never covers an entry twice, so a
    /// single-frame clip forms one whole-clip generation per loop.
    pub fn plan(
        &self,
        trace: &[TraceEntry],
        first_entry: usize,
        sequence: u64,
    ) -> BrookResult<GenerationPlan> {
        if trace.is_empty() {
            return Err(BrookError::Configuration);
        }
        if first_entry >= trace.len() {
            return Err(BrookError::InvalidState);
        }

        let frame_id = trace[first_entry].frame_id;
        let mtu = self.config.mtu;
        let mut packet_ids: Vec<u32> = Vec::new();
        let mut entry_count = 0;

        while entry_count < trace.len() {
            let entry = &trace[(first_entry + entry_count) % trace.len()];
            if entry_count > 0 && entry.frame_id != frame_id {
                break;
            }
            let payload = entry.payload_size as usize;
            // Full-MTU fragments, then the remainder if any.
            for _ in 0..payload / mtu {
                packet_ids.push(entry.packet_id);
            }
            if payload % mtu > 0 {
                packet_ids.push(entry.packet_id);
            }
            entry_count += 1;
        }

        let symbol_count = packet_ids.len();
        if symbol_count == 0 || symbol_count > MAX_GENERATION_SYMBOLS {
            // A frame with no payload bytes cannot seed a codec; a frame
            // beyond the cap would blow the elimination arena.
            return Err(BrookError::Configuration);
        }

        let tx_packets = ceil_tx_packets(symbol_count, self.config.overhead);
        let interval_us =
            ((1_000_000.0 / (self.config.frame_rate * tx_packets as f64)) as u64).max(1);

        let last_id = packet_ids[symbol_count - 1];
        for _ in 0..tx_packets - symbol_count {
            packet_ids.push(last_id);
        }

        Ok(GenerationPlan {
            sequence,
            frame_id,
            first_entry,
            entry_count,
            symbol_count,
            symbol_size: mtu,
            tx_packets,
            interval_us,
            packet_ids,
        })
    }
}
