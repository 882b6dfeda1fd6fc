//! An in-process stand-in for the radio path.
//!
//! `LossyLink` accepts datagrams through the [`Datalink`] seam, prepends the
//! transport header, and holds each survivor in a delivery queue until its
//! arrival time. Loss is an independent coin flip per datagram; jitter draws
//! a uniform extra delay, so two back-to-back packets can swap places.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use brook_core::wire::TransportHeader;
use brook_core::BrookError;
use brook_hal::Datalink;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Channel model knobs.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Independent drop probability per datagram, in [0, 1].
    pub loss: f64,
    /// Fixed one-way delay.
    pub latency_us: u64,
    /// Uniform extra delay in [0, jitter_us]. Larger than the pacing
    /// interval means reordering.
    pub jitter_us: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { loss: 0.0, latency_us: 2_000, jitter_us: 0 }
    }
}

/// Running totals on the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    /// Datagrams the link accepted from the sender.
    pub accepted: u64,
    /// Datagrams the channel ate.
    pub dropped: u64,
    /// Datagrams handed to the receiver side.
    pub delivered: u64,
}

struct InFlight {
    deliver_at_us: u64,
    /// Monotone push index; ties deliver in send order.
    push_id: u64,
    datagram: Vec<u8>,
}

impl PartialEq for InFlight {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at_us == other.deliver_at_us && self.push_id == other.push_id
    }
}

impl Eq for InFlight {}

impl PartialOrd for InFlight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InFlight {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deliver_at_us, self.push_id).cmp(&(other.deliver_at_us, other.push_id))
    }
}

/// Seeded lossy channel implementing the delivery-substrate seam.
pub struct LossyLink {
    config: LinkConfig,
    rng: StdRng,
    now_us: u64,
    queue: BinaryHeap<Reverse<InFlight>>,
    pushes: u64,
    counters: LinkCounters,
}

impl LossyLink {
    pub fn new(config: LinkConfig, seed: u64) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&config.loss) {
            anyhow::bail!("loss probability {} outside [0, 1]", config.loss);
        }
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            now_us: 0,
            queue: BinaryHeap::new(),
            pushes: 0,
            counters: LinkCounters::default(),
        })
    }

    /// Moves the channel clock forward; stamps subsequent sends.
    pub fn advance_to(&mut self, now_us: u64) {
        self.now_us = self.now_us.max(now_us);
    }

    /// Arrival time of the earliest in-flight datagram.
    pub fn next_delivery_us(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(p)| p.deliver_at_us)
    }

    /// Pops the earliest datagram due at or before `now_us`, header already
    /// stripped.
    pub fn pop_due(&mut self, now_us: u64) -> Option<(TransportHeader, Vec<u8>)> {
        match self.queue.peek() {
            Some(Reverse(p)) if p.deliver_at_us <= now_us => {}
            _ => return None,
        }
        let Reverse(packet) = self.queue.pop()?;
        // The link wrote this header itself; it always parses.
        let header = TransportHeader::from_bytes(&packet.datagram).ok()?;
        self.counters.delivered += 1;
        Some((header, packet.datagram[TransportHeader::SIZE..].to_vec()))
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    pub fn counters(&self) -> LinkCounters {
        self.counters
    }
}

impl Datalink for LossyLink {
    fn send(&mut self, seq: u32, frame: &[u8]) -> nb::Result<usize, BrookError> {
        self.counters.accepted += 1;

        if self.rng.gen::<f64>() < self.config.loss {
            self.counters.dropped += 1;
            debug!("t={}us channel dropped seq {}", self.now_us, seq);
            return Ok(frame.len());
        }

        let mut datagram = vec![0u8; TransportHeader::SIZE + frame.len()];
        let header = TransportHeader { seq, tx_time_us: self.now_us };
        header
            .to_bytes(&mut datagram[..TransportHeader::SIZE])
            .map_err(nb::Error::Other)?;
        datagram[TransportHeader::SIZE..].copy_from_slice(frame);

        let jitter = if self.config.jitter_us > 0 {
            self.rng.gen_range(0..=self.config.jitter_us)
        } else {
            0
        };
        self.queue.push(Reverse(InFlight {
            deliver_at_us: self.now_us + self.config.latency_us + jitter,
            push_id: self.pushes,
            datagram,
        }));
        self.pushes += 1;
        Ok(frame.len())
    }
}
