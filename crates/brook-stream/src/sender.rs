//! The transmit side of the coded stream.
//!
//! `VideoSender` owns the active generation's encoder and is driven by a
//! host scheduler: `start` arms a zero-delay first tick, every `on_tick`
//! emits exactly one coded packet and returns the delay until the next.
//! Generation boundaries are detected by packet-count exhaustion and the
//! encoder is re-keyed through the planner, never inside the send path.

use alloc::vec;
use alloc::vec::Vec;

use brook_codec::{CodecFactory, GenerationEncoder};
use brook_core::wire::{encode_frame_id, TAG_BYTES};
use brook_core::{BrookError, BrookResult, TraceEntry};
use brook_hal::Datalink;
use log::{debug, info, warn};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use crate::planner::{GenerationPlan, GenerationPlanner, StreamConfig};

/// Running totals kept across the sender's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderCounters {
    /// Datagrams the substrate accepted.
    pub sent: u64,
    /// Datagrams the substrate refused (WouldBlock or error). Never
    /// retried; redundancy covers the hole.
    pub send_failures: u64,
    /// Planned vs declared wire-size disagreements. Diagnostic only.
    pub size_mismatches: u64,
    /// Generations planned so far.
    pub generations: u64,
}

/// Snapshot of the generation currently on the wire.
#[derive(Debug, Clone, Copy)]
pub struct GenerationView<'a> {
    pub sequence: u64,
    pub frame_id: u32,
    pub tag: u8,
    pub symbol_count: usize,
    /// The source block this generation codes. Synthesized from the
    /// sender's seeded stream, so a receiver-side copy can be verified.
    pub block: &'a [u8],
}

struct ActiveGeneration<E> {
    plan: GenerationPlan,
    encoder: E,
    /// Next transmission index in [0, plan.tx_packets].
    cursor: usize,
}

pub struct VideoSender<L, F: CodecFactory> {
    planner: GenerationPlanner,
    trace: Vec<TraceEntry>,
    link: L,
    codec: F,
    /// Synthesizes frame payloads and derives per-generation codec seeds.
    rng: ChaCha20Rng,
    active: Option<ActiveGeneration<F::Encoder>>,
    /// Trace index where the next generation starts.
    next_entry: usize,
    next_sequence: u64,
    /// Bumps every time the trace cursor wraps; varies the out sequence.
    loop_count: u8,
    /// Set when the current generation covers the trace's last entry; the
    /// bump applies from the next generation on.
    wrap_pending: bool,
    scratch: Vec<u8>,
    counters: SenderCounters,
}

impl<L: Datalink, F: CodecFactory> VideoSender<L, F> {
    /// Fails fast on an empty trace or a bad config, before any tick is
    /// scheduled.
    pub fn new(
        link: L,
        codec: F,
        config: StreamConfig,
        trace: Vec<TraceEntry>,
        seed: u64,
    ) -> BrookResult<Self> {
        let planner = GenerationPlanner::new(config)?;
        if trace.is_empty() {
            return Err(BrookError::Configuration);
        }
        Ok(Self {
            planner,
            trace,
            link,
            codec,
            rng: ChaCha20Rng::seed_from_u64(seed),
            active: None,
            next_entry: 0,
            next_sequence: 0,
            loop_count: 0,
            wrap_pending: false,
            scratch: Vec::new(),
            counters: SenderCounters::default(),
        })
    }

    /// Builds the first generation and returns the delay (zero) until the
    /// first tick.
    pub fn start(&mut self) -> BrookResult<u64> {
        if self.active.is_some() {
            return Err(BrookError::InvalidState);
        }
        self.next_generation()?;
        Ok(0)
    }

    /// Emits one coded packet and returns the pacing delay until the next
    /// tick. Ticks are strictly sequential: the host schedules the next
    /// only after this call returns.
    pub fn on_tick(&mut self, now_us: u64) -> BrookResult<u64> {
        let exhausted = match &self.active {
            None => return Err(BrookError::InvalidState),
            Some(gen) => gen.cursor == gen.plan.tx_packets,
        };
        if exhausted {
            self.next_generation()?;
        }

        let suffix_len = self.planner.config().suffix_len();
        let gen = match self.active.as_mut() {
            Some(g) => g,
            None => return Err(BrookError::InvalidState),
        };

        // Compose the packet: coded symbol, tag, coefficients, suffix.
        let layout = gen.plan.layout(suffix_len);
        let declared = gen.encoder.coded_len() + TAG_BYTES + suffix_len;
        if declared != layout.wire_len() {
            self.counters.size_mismatches += 1;
            warn!(
                "gen {}: planned wire size {} != declared {}",
                gen.plan.sequence,
                layout.wire_len(),
                declared
            );
        }
        self.scratch.resize(layout.wire_len(), 0);
        {
            let (symbol, tag, coefficients, suffix) = layout.split_mut(&mut self.scratch)?;
            gen.encoder.encode(symbol, coefficients)?;
            *tag = gen.plan.tag();
            encode_frame_id(gen.plan.frame_id, suffix)?;
        }

        let seq = gen.plan.packet_ids[gen.cursor]
            .wrapping_mul(10)
            .wrapping_add(self.loop_count as u32);
        let interval_us = gen.plan.interval_us;
        gen.cursor += 1;

        match self.link.send(seq, &self.scratch) {
            Ok(_) => {
                self.counters.sent += 1;
                debug!("t={}us sent seq {} ({} bytes)", now_us, seq, self.scratch.len());
            }
            Err(_) => {
                self.counters.send_failures += 1;
                warn!("t={}us substrate refused seq {}", now_us, seq);
            }
        }

        Ok(interval_us)
    }

    /// Drops the active generation; further ticks are a contract breach.
    pub fn shutdown(&mut self) {
        self.active = None;
        info!(
            "sender stopped: {} sent, {} refused, {} size mismatches, {} generations",
            self.counters.sent,
            self.counters.send_failures,
            self.counters.size_mismatches,
            self.counters.generations
        );
    }

    /// Plans the next generation, builds a fresh encoder, and seeds it
    /// with this frame's synthesized block in fully-coded mode.
    fn next_generation(&mut self) -> BrookResult<()> {
        if self.wrap_pending {
            // The previous generation finished the clip; every packet
            // from here on carries the next loop's count.
            self.loop_count = (self.loop_count + 1) % 255;
            self.wrap_pending = false;
        }

        let plan = self
            .planner
            .plan(&self.trace, self.next_entry, self.next_sequence)?;
        let mut encoder = self
            .codec
            .build_encoder(plan.symbol_count, plan.symbol_size)?;

        let mut block = vec![0u8; plan.block_len()];
        self.rng.fill_bytes(&mut block);
        encoder.reseed(self.rng.next_u64());
        encoder.set_symbols(&block)?;
        encoder.set_systematic_off();

        self.wrap_pending = plan.first_entry + plan.entry_count >= self.trace.len();
        self.next_entry = (plan.first_entry + plan.entry_count) % self.trace.len();
        self.next_sequence += 1;
        self.counters.generations += 1;

        info!(
            "gen {} frame {}: {} symbols x {}B, {} tx packets ({} redundant), {}B wire, {}us pace",
            plan.sequence,
            plan.frame_id,
            plan.symbol_count,
            plan.symbol_size,
            plan.tx_packets,
            plan.redundancy(),
            plan.layout(self.planner.config().suffix_len()).wire_len(),
            plan.interval_us
        );

        self.active = Some(ActiveGeneration { plan, encoder, cursor: 0 });
        Ok(())
    }

    /// The generation currently on the wire, if started.
    pub fn generation(&self) -> Option<GenerationView<'_>> {
        self.active.as_ref().map(|gen| GenerationView {
            sequence: gen.plan.sequence,
            frame_id: gen.plan.frame_id,
            tag: gen.plan.tag(),
            symbol_count: gen.plan.symbol_count,
            block: gen.encoder.block(),
        })
    }

    pub fn counters(&self) -> SenderCounters {
        self.counters
    }

    pub fn loop_count(&self) -> u8 {
        self.loop_count
    }

    pub fn config(&self) -> &StreamConfig {
        self.planner.config()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
