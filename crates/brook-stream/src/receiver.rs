//! The receive side of the coded stream.
//!
//! One decoder per in-flight generation, keyed by (frame id, tag) so
//! looped replays of the same frame never alias. Decoded frames and
//! abandonment notices queue up as [`StreamEvent`]s for the host to drain
//! after each delivery.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec;
use alloc::vec::Vec;

use brook_codec::{CodecFactory, GenerationDecoder};
use brook_core::wire::{frame_suffix_len, parse_coded_packet};
use brook_core::{BrookError, BrookResult, MAX_GENERATION_SYMBOLS};
use log::{debug, info, warn};

use crate::loss::LossWindow;

/// Keys retained after retirement to swallow late duplicates.
const RETIRED_KEYS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct ReceiverConfig {
    /// Symbol size; must match the sender's MTU.
    pub mtu: usize,
    /// Clip length; sets the expected frame-id suffix width.
    pub total_frames: u32,
    /// Loss window bitmap size. Multiple of 8 within 8..=256.
    pub loss_window: u16,
    /// A generation with no arrival for this long is abandoned.
    pub abandon_after_us: u64,
    /// In-flight generation cap; the stalest is abandoned when full.
    pub max_in_flight: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            mtu: 1400,
            total_frames: 600,
            loss_window: 32,
            abandon_after_us: 250_000,
            max_in_flight: 8,
        }
    }
}

/// What the stream hands upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A generation reached full rank. `bytes` is the frame's source
    /// block in source-symbol order.
    FrameDecoded {
        frame_id: u32,
        tag: u8,
        symbols: usize,
        bytes: Vec<u8>,
    },
    /// A generation was dropped before full rank: timed out, evicted by
    /// the in-flight cap, or still pending at shutdown.
    GenerationAbandoned {
        frame_id: u32,
        tag: u8,
        rank: usize,
        symbols: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct GenKey {
    frame_id: u32,
    tag: u8,
}

struct GenState<D> {
    decoder: D,
    last_rx_us: u64,
    packets: u64,
}

pub struct VideoReceiver<F: CodecFactory> {
    config: ReceiverConfig,
    codec: F,
    suffix_len: usize,
    states: BTreeMap<GenKey, GenState<F::Decoder>>,
    retired: VecDeque<GenKey>,
    events: VecDeque<StreamEvent>,
    loss: LossWindow,
    received: u64,
    malformed: u64,
    decoded: u64,
    abandoned: u64,
}

impl<F: CodecFactory> VideoReceiver<F> {
    pub fn new(codec: F, config: ReceiverConfig) -> BrookResult<Self> {
        if config.mtu == 0 || config.total_frames == 0 || config.max_in_flight == 0 {
            return Err(BrookError::Configuration);
        }
        let loss = LossWindow::new(config.loss_window)?;
        Ok(Self {
            suffix_len: frame_suffix_len(config.total_frames),
            config,
            codec,
            states: BTreeMap::new(),
            retired: VecDeque::new(),
            events: VecDeque::new(),
            loss,
            received: 0,
            malformed: 0,
            decoded: 0,
            abandoned: 0,
        })
    }

    /// Feeds one delivered datagram. Malformed input is counted, never
    /// fatal; every parsed packet updates the loss window whether or not
    /// it raises a rank.
    pub fn on_receive(&mut self, now_us: u64, seq: u32, datagram: &[u8]) {
        self.expire_stale(now_us);

        let packet = match parse_coded_packet(datagram, self.config.mtu, self.suffix_len) {
            Ok(p) => p,
            Err(_) => {
                self.malformed += 1;
                warn!("malformed datagram: {} bytes, seq {}", datagram.len(), seq);
                return;
            }
        };
        let symbols = packet.symbol_count();
        if symbols > MAX_GENERATION_SYMBOLS {
            self.malformed += 1;
            warn!("datagram claims {} symbols, over the cap", symbols);
            return;
        }

        self.loss.notify_received(seq);
        self.received += 1;

        let key = GenKey { frame_id: packet.frame_id, tag: packet.tag };
        if self.retired.contains(&key) {
            debug!("late packet for retired frame {} tag {}", key.frame_id, key.tag);
            return;
        }

        if !self.states.contains_key(&key) {
            if self.states.len() >= self.config.max_in_flight {
                self.abandon_stalest();
            }
            let decoder = match self.codec.build_decoder(symbols, self.config.mtu) {
                Ok(d) => d,
                Err(_) => {
                    self.malformed += 1;
                    return;
                }
            };
            debug!(
                "frame {} tag {}: new generation, {} symbols",
                key.frame_id, key.tag, symbols
            );
            self.states
                .insert(key, GenState { decoder, last_rx_us: now_us, packets: 0 });
        }

        let mut completed = false;
        if let Some(state) = self.states.get_mut(&key) {
            state.last_rx_us = now_us;
            state.packets += 1;
            if state.decoder.symbols() != symbols {
                // Same (frame, tag) with a different dimension: corrupt
                // input or a tag collision. Keep the existing state.
                self.malformed += 1;
                warn!(
                    "frame {} tag {}: dimension conflict ({} vs {})",
                    key.frame_id,
                    key.tag,
                    symbols,
                    state.decoder.symbols()
                );
                return;
            }
            match state.decoder.decode(packet.coefficients, packet.symbol) {
                Ok(innovative) => {
                    debug!(
                        "frame {} tag {}: rank {}/{}{}",
                        key.frame_id,
                        key.tag,
                        state.decoder.rank(),
                        symbols,
                        if innovative { "" } else { " (dependent)" }
                    );
                }
                Err(_) => {
                    self.malformed += 1;
                    return;
                }
            }
            completed = state.decoder.is_complete();
        }

        if completed {
            self.deliver(key);
        }
    }

    /// Extracts a full-rank generation and retires its state.
    fn deliver(&mut self, key: GenKey) {
        if let Some(mut state) = self.states.remove(&key) {
            let symbols = state.decoder.symbols();
            let mut bytes = vec![0u8; symbols * state.decoder.symbol_size()];
            match state.decoder.copy_decoded_symbols(&mut bytes) {
                Ok(()) => {
                    info!(
                        "frame {} tag {}: decoded from {} packets",
                        key.frame_id, key.tag, state.packets
                    );
                    self.decoded += 1;
                    self.events.push_back(StreamEvent::FrameDecoded {
                        frame_id: key.frame_id,
                        tag: key.tag,
                        symbols,
                        bytes,
                    });
                }
                Err(_) => {
                    // Full rank but extraction refused: treat as lost.
                    self.abandoned += 1;
                    self.events.push_back(StreamEvent::GenerationAbandoned {
                        frame_id: key.frame_id,
                        tag: key.tag,
                        rank: state.decoder.rank(),
                        symbols,
                    });
                }
            }
            self.retire(key);
        }
    }

    /// Abandons every generation whose last arrival is older than the
    /// configured timeout. Also safe to call from a host idle hook.
    pub fn expire_stale(&mut self, now_us: u64) {
        loop {
            let stale = self.states.iter().find_map(|(key, state)| {
                if now_us.saturating_sub(state.last_rx_us) > self.config.abandon_after_us {
                    Some(*key)
                } else {
                    None
                }
            });
            match stale {
                Some(key) => self.abandon(key, "timed out"),
                None => break,
            }
        }
    }

    /// Frees the generation with the oldest last arrival.
    fn abandon_stalest(&mut self) {
        let stalest = self
            .states
            .iter()
            .min_by_key(|(_, state)| state.last_rx_us)
            .map(|(key, _)| *key);
        if let Some(key) = stalest {
            self.abandon(key, "evicted");
        }
    }

    fn abandon(&mut self, key: GenKey, cause: &str) {
        if let Some(state) = self.states.remove(&key) {
            warn!(
                "frame {} tag {}: {} at rank {}/{}",
                key.frame_id,
                key.tag,
                cause,
                state.decoder.rank(),
                state.decoder.symbols()
            );
            self.abandoned += 1;
            self.events.push_back(StreamEvent::GenerationAbandoned {
                frame_id: key.frame_id,
                tag: key.tag,
                rank: state.decoder.rank(),
                symbols: state.decoder.symbols(),
            });
            self.retire(key);
        }
    }

    fn retire(&mut self, key: GenKey) {
        self.retired.push_back(key);
        while self.retired.len() > RETIRED_KEYS {
            self.retired.pop_front();
        }
    }

    /// Abandons everything still in flight. Call once at end of stream.
    pub fn shutdown(&mut self) {
        while let Some(key) = self.states.keys().next().copied() {
            self.abandon(key, "pending at shutdown");
        }
        info!(
            "receiver stopped: {} received, {} malformed, {} decoded, {} abandoned",
            self.received, self.malformed, self.decoded, self.abandoned
        );
    }

    /// Next queued event, oldest first.
    pub fn pop_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }

    /// Cumulative packets accepted, distinct from the window-scoped
    /// loss counts.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    pub fn decoded_frames(&self) -> u64 {
        self.decoded
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned
    }

    pub fn in_flight(&self) -> usize {
        self.states.len()
    }

    pub fn window_received(&self) -> u32 {
        self.loss.received_in_window()
    }

    pub fn window_lost(&self) -> u32 {
        self.loss.lost_in_window()
    }
}
