//! Single-threaded scenario loop in virtual time.
//!
//! The loop plays the roles the transport core leaves to collaborators: it
//! is the scheduler (sender ticks fire at the delays `on_tick` returns) and
//! the topology (datagrams come back out of the [`LossyLink`] at their
//! arrival times). Deliveries due at the same instant as a tick land first,
//! so a handler never observes time moving backwards.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use brook_codec::FullVectorRlnc;
use brook_core::TraceEntry;
use brook_stream::{ReceiverConfig, StreamConfig, StreamEvent, VideoReceiver, VideoSender};
use log::{info, warn};

use crate::link::{LinkConfig, LossyLink};

/// Everything one run needs.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioConfig {
    pub stream: StreamConfig,
    pub link: LinkConfig,
    /// Loss window bitmap size, multiple of 8 within 8..=256.
    pub loss_window: u16,
    pub abandon_after_us: u64,
    pub max_in_flight: usize,
    /// Ticks stop here; in-flight datagrams still drain.
    pub duration_us: u64,
    /// Seeds the sender's payload stream and the channel coin flips.
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            link: LinkConfig::default(),
            loss_window: 32,
            abandon_after_us: 250_000,
            max_in_flight: 8,
            duration_us: 1_000_000,
            seed: 0,
        }
    }
}

/// End-of-run summary, sender side first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub sent: u64,
    pub send_failures: u64,
    pub size_mismatches: u64,
    pub generations: u64,
    pub link_dropped: u64,
    pub delivered: u64,
    pub received: u64,
    pub malformed: u64,
    pub decoded_frames: u64,
    pub abandoned: u64,
    /// Decoded frames whose bytes matched the sender's source block.
    pub verified_frames: u64,
    pub integrity_failures: u64,
    pub window_received: u32,
    pub window_lost: u32,
    pub mean_transit_us: u64,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sender:    {} generations, {} sent, {} refused, {} size mismatches",
            self.generations, self.sent, self.send_failures, self.size_mismatches
        )?;
        writeln!(
            f,
            "channel:   {} dropped, {} delivered, mean transit {}us",
            self.link_dropped, self.delivered, self.mean_transit_us
        )?;
        writeln!(
            f,
            "receiver:  {} received, {} malformed, {} frames decoded, {} abandoned",
            self.received, self.malformed, self.decoded_frames, self.abandoned
        )?;
        writeln!(
            f,
            "window:    {} received, {} lost",
            self.window_received, self.window_lost
        )?;
        write!(
            f,
            "integrity: {}/{} decoded frames verified",
            self.verified_frames, self.decoded_frames
        )
    }
}

/// Source blocks the sender has put on the wire, for integrity checks.
/// Keyed like the receiver keys its generations.
struct BlockLedger {
    blocks: BTreeMap<(u32, u8), Vec<u8>>,
    last_sequence: Option<u64>,
}

impl BlockLedger {
    fn new() -> Self {
        Self { blocks: BTreeMap::new(), last_sequence: None }
    }

    fn observe(&mut self, sender: &VideoSender<LossyLink, FullVectorRlnc>) {
        if let Some(view) = sender.generation() {
            if self.last_sequence != Some(view.sequence) {
                self.blocks.insert((view.frame_id, view.tag), view.block.to_vec());
                self.last_sequence = Some(view.sequence);
            }
        }
    }

    fn verify(&self, frame_id: u32, tag: u8, bytes: &[u8]) -> Option<bool> {
        self.blocks.get(&(frame_id, tag)).map(|block| block == bytes)
    }
}

/// Runs one sender/receiver pair over the lossy channel until `duration_us`
/// of virtual time has passed and the channel has drained.
pub fn run_scenario(
    config: ScenarioConfig,
    trace: Vec<TraceEntry>,
) -> anyhow::Result<ScenarioReport> {
    let link = LossyLink::new(config.link, config.seed.wrapping_add(1))?;
    let mut sender = VideoSender::new(link, FullVectorRlnc, config.stream, trace, config.seed)
        .context("building the sender")?;
    let mut receiver = VideoReceiver::new(
        FullVectorRlnc,
        ReceiverConfig {
            mtu: config.stream.mtu,
            total_frames: config.stream.total_frames,
            loss_window: config.loss_window,
            abandon_after_us: config.abandon_after_us,
            max_in_flight: config.max_in_flight,
        },
    )
    .context("building the receiver")?;

    let mut ledger = BlockLedger::new();
    let mut report = ScenarioReport::default();
    let mut transit_sum_us: u64 = 0;

    let mut now_us: u64 = 0;
    let mut next_tick_us = Some(sender.start().context("starting the stream")?);
    ledger.observe(&sender);

    loop {
        let delivery_us = sender.link().next_delivery_us();
        let due = match (next_tick_us, delivery_us) {
            (None, None) => break,
            (Some(t), None) => t,
            (None, Some(d)) => d,
            (Some(t), Some(d)) => t.min(d),
        };
        now_us = now_us.max(due);

        // Deliveries first at a shared instant.
        if delivery_us == Some(due) {
            if let Some((header, payload)) = sender.link_mut().pop_due(now_us) {
                transit_sum_us += now_us.saturating_sub(header.tx_time_us);
                receiver.on_receive(now_us, header.seq, &payload);
                drain_events(&mut receiver, &ledger, &mut report);
            }
            continue;
        }

        sender.link_mut().advance_to(now_us);
        let delay_us = sender.on_tick(now_us).context("sender tick")?;
        ledger.observe(&sender);
        let at = now_us + delay_us;
        next_tick_us = if at <= config.duration_us {
            Some(at)
        } else {
            info!("t={}us: clip time over, draining the channel", now_us);
            None
        };
    }

    sender.shutdown();
    receiver.shutdown();
    drain_events(&mut receiver, &ledger, &mut report);

    let counters = sender.counters();
    report.sent = counters.sent;
    report.send_failures = counters.send_failures;
    report.size_mismatches = counters.size_mismatches;
    report.generations = counters.generations;
    let link = sender.link().counters();
    report.link_dropped = link.dropped;
    report.delivered = link.delivered;
    report.received = receiver.received();
    report.malformed = receiver.malformed();
    report.decoded_frames = receiver.decoded_frames();
    report.abandoned = receiver.abandoned();
    report.window_received = receiver.window_received();
    report.window_lost = receiver.window_lost();
    report.mean_transit_us = if link.delivered > 0 {
        transit_sum_us / link.delivered
    } else {
        0
    };
    Ok(report)
}

fn drain_events(
    receiver: &mut VideoReceiver<FullVectorRlnc>,
    ledger: &BlockLedger,
    report: &mut ScenarioReport,
) {
    while let Some(event) = receiver.pop_event() {
        if let StreamEvent::FrameDecoded { frame_id, tag, bytes, .. } = event {
            match ledger.verify(frame_id, tag, &bytes) {
                Some(true) => report.verified_frames += 1,
                Some(false) => {
                    report.integrity_failures += 1;
                    warn!("frame {} tag {}: decoded bytes differ from the source", frame_id, tag);
                }
                None => {
                    report.integrity_failures += 1;
                    warn!("frame {} tag {}: no source block on record", frame_id, tag);
                }
            }
        }
    }
}
