use alloc::vec;
use alloc::vec::Vec;

use brook_core::{BrookError, BrookResult};

#[derive(Debug, Clone, Copy)]
struct Span {
    lowest: u32,
    highest: u32,
}

/// Sliding-window loss estimator over transport sequence numbers.
///
/// Keeps one presence bit for each of the last N sequence numbers in a
/// circular bitmap. Marking a newer sequence evicts the slots that slide
/// out of the window, so memory stays fixed and queries cover only the
/// window (highest-N, highest], never the whole stream.
#[derive(Debug, Clone)]
pub struct LossWindow {
    map: Vec<u8>,
    window: u32,
    span: Option<Span>,
}

impl LossWindow {
    /// `bits` must be a multiple of 8 within 8..=256.
    pub fn new(bits: u16) -> BrookResult<Self> {
        if bits < 8 || bits > 256 || bits % 8 != 0 {
            return Err(BrookError::Configuration);
        }
        Ok(Self {
            map: vec![0u8; bits as usize / 8],
            window: bits as u32,
            span: None,
        })
    }

    pub fn window_size(&self) -> u32 {
        self.window
    }

    fn set_bit(&mut self, seq: u32) {
        let slot = (seq % self.window) as usize;
        self.map[slot / 8] |= 1 << (slot % 8);
    }

    fn clear_bit(&mut self, seq: u32) {
        let slot = (seq % self.window) as usize;
        self.map[slot / 8] &= !(1 << (slot % 8));
    }

    /// Marks `seq` present and slides the window forward when it is the
    /// newest sequence seen. Arrivals older than the window are ignored.
    pub fn notify_received(&mut self, seq: u32) {
        match self.span {
            None => {
                self.map.fill(0);
                self.set_bit(seq);
                self.span = Some(Span { lowest: seq, highest: seq });
            }
            Some(mut s) => {
                if seq > s.highest {
                    if seq - s.highest >= self.window {
                        // The whole old window slid out.
                        self.map.fill(0);
                    } else {
                        for evicted in (s.highest + 1)..=seq {
                            self.clear_bit(evicted);
                        }
                    }
                    self.set_bit(seq);
                    s.highest = seq;
                } else if s.highest - seq < self.window {
                    // Late arrival, still inside the window.
                    self.set_bit(seq);
                }
                s.lowest = s.lowest.min(seq);
                self.span = Some(s);
            }
        }
    }

    /// Sequences marked present inside the current window.
    pub fn received_in_window(&self) -> u32 {
        self.map.iter().map(|b| b.count_ones()).sum()
    }

    /// Window positions with no arrival. The count starts at the first
    /// sequence ever seen, so a stream beginning high does not charge the
    /// numbers below it as losses.
    pub fn lost_in_window(&self) -> u32 {
        match self.span {
            None => 0,
            Some(s) => {
                let window_start = s.highest.saturating_sub(self.window - 1);
                let start = window_start.max(s.lowest);
                let covered = s.highest - start + 1;
                covered - self.received_in_window()
            }
        }
    }
}
