use brook_codec::FullVectorRlnc;
use brook_core::wire::{encode_frame_id, PacketLayout};
use brook_core::{BrookError, TraceEntry};
use brook_hal::Datalink;
use brook_stream::{ReceiverConfig, StreamConfig, StreamEvent, VideoReceiver, VideoSender};

fn entry(frame_id: u32, packet_id: u32, payload_size: u16) -> TraceEntry {
    TraceEntry { frame_id, packet_id, payload_size, interval_us: 1_000_000, layer_id: 0 }
}

/// Records everything the sender hands to the substrate.
struct CaptureLink {
    sent: Vec<(u32, Vec<u8>)>,
    refuse: bool,
}

impl CaptureLink {
    fn new() -> Self {
        Self { sent: Vec::new(), refuse: false }
    }
}

impl Datalink for CaptureLink {
    fn send(&mut self, seq: u32, frame: &[u8]) -> nb::Result<usize, BrookError> {
        if self.refuse {
            return Err(nb::Error::Other(BrookError::SendFailure));
        }
        self.sent.push((seq, frame.to_vec()));
        Ok(frame.len())
    }
}

fn config(mtu: usize, overhead: f64) -> StreamConfig {
    StreamConfig { mtu, overhead, frame_rate: 60.0, total_frames: 600 }
}

fn receiver_config(mtu: usize) -> ReceiverConfig {
    ReceiverConfig { mtu, total_frames: 600, ..ReceiverConfig::default() }
}

#[test]
fn test_sender_rejects_empty_trace() {
    let built = VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 0.0), vec![], 1);
    assert!(matches!(built, Err(BrookError::Configuration)));
}

#[test]
fn test_start_twice_is_a_contract_breach() {
    let trace = vec![entry(1, 1, 100)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 0.0), trace, 1).unwrap();
    assert_eq!(sender.start().unwrap(), 0);
    assert_eq!(sender.start(), Err(BrookError::InvalidState));
}

#[test]
fn test_sender_emits_planned_generation() {
    // One 3000-byte frame at 50% overhead: 3 symbols, 5 tx packets, all
    // backed by trace packet id 1.
    let trace = vec![entry(1, 1, 3000)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 0.5), trace, 7).unwrap();

    assert_eq!(sender.start().unwrap(), 0);
    let expected_interval = 1_000_000 / (60 * 5);
    for i in 0..5 {
        let delay = sender.on_tick(i * expected_interval).unwrap();
        assert_eq!(delay, expected_interval);
    }

    let wire_len = 1400 + 1 + 3 + 3;
    let sent = &sender.link().sent;
    assert_eq!(sent.len(), 5);
    for (seq, datagram) in sent {
        assert_eq!(*seq, 1 * 10 + 0);
        assert_eq!(datagram.len(), wire_len);
    }
    assert_eq!(sender.counters().sent, 5);
    assert_eq!(sender.counters().generations, 1);
}

#[test]
fn test_loop_counter_varies_the_sequence() {
    // Single-frame clip: every generation wraps the trace, so the loop
    // count bumps at each boundary and shows up in the out sequence.
    let trace = vec![entry(1, 4, 100)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 0.0), trace, 7).unwrap();
    sender.start().unwrap();

    for tick in 0..3 {
        sender.on_tick(tick as u64).unwrap();
    }

    let seqs: Vec<u32> = sender.link().sent.iter().map(|(seq, _)| *seq).collect();
    assert_eq!(seqs, vec![40, 41, 42]);
    assert_eq!(sender.loop_count(), 2);
    assert_eq!(sender.counters().generations, 3);
}

#[test]
fn test_send_failure_is_counted_not_fatal() {
    let trace = vec![entry(1, 1, 100)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 0.0), trace, 7).unwrap();
    sender.link_mut().refuse = true;
    sender.start().unwrap();

    assert!(sender.on_tick(0).is_ok());
    assert_eq!(sender.counters().send_failures, 1);
    assert_eq!(sender.counters().sent, 0);
}

#[test]
fn test_end_to_end_decode_in_reverse_order() {
    // Two frames; capture a whole redundant generation and deliver it
    // backwards. Linear decoding does not care about arrival order.
    let trace = vec![entry(1, 1, 3000), entry(2, 2, 1500)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 1.0), trace, 11).unwrap();
    sender.start().unwrap();

    let view = sender.generation().unwrap();
    let (frame_id, tag, block) = (view.frame_id, view.tag, view.block.to_vec());
    assert_eq!(frame_id, 1);

    // 3 symbols at 100% overhead: 6 packets cover the first generation.
    for tick in 0..6 {
        sender.on_tick(tick as u64).unwrap();
    }

    let mut receiver = VideoReceiver::new(FullVectorRlnc, receiver_config(1400)).unwrap();
    for (seq, datagram) in sender.link().sent.iter().rev() {
        receiver.on_receive(0, *seq, datagram);
    }

    match receiver.pop_event() {
        Some(StreamEvent::FrameDecoded { frame_id: fid, tag: t, symbols, bytes }) => {
            assert_eq!(fid, frame_id);
            assert_eq!(t, tag);
            assert_eq!(symbols, 3);
            assert_eq!(bytes, block);
        }
        other => panic!("expected a decoded frame, got {:?}", other),
    }
    assert_eq!(receiver.decoded_frames(), 1);
    assert_eq!(receiver.in_flight(), 0);
}

#[test]
fn test_late_duplicates_do_not_resurrect_state() {
    let trace = vec![entry(1, 1, 2800)];
    let mut sender =
        VideoSender::new(CaptureLink::new(), FullVectorRlnc, config(1400, 1.0), trace, 3).unwrap();
    sender.start().unwrap();
    for tick in 0..4 {
        sender.on_tick(tick as u64).unwrap();
    }

    let mut receiver = VideoReceiver::new(FullVectorRlnc, receiver_config(1400)).unwrap();
    for (seq, datagram) in &sender.link().sent {
        receiver.on_receive(0, *seq, datagram);
    }
    assert_eq!(receiver.decoded_frames(), 1);
    assert_eq!(receiver.in_flight(), 0);

    // Replaying the generation hits the retired-key ring, not a fresh
    // decoder; the packets still count as received for the loss window.
    let before = receiver.received();
    let (seq, datagram) = sender.link().sent[0].clone();
    receiver.on_receive(0, seq, &datagram);
    assert_eq!(receiver.in_flight(), 0);
    assert_eq!(receiver.received(), before + 1);
}

/// Hand-builds one coded packet so receiver edge cases need no sender.
fn synthetic_packet(mtu: usize, symbols: usize, tag: u8, frame_id: u32, pivot: usize) -> Vec<u8> {
    let layout = PacketLayout { symbol_size: mtu, symbol_count: symbols, suffix_len: 3 };
    let mut datagram = vec![0u8; layout.wire_len()];
    let (symbol, tag_slot, coefficients, suffix) = layout.split_mut(&mut datagram).unwrap();
    symbol.fill(0x5A);
    *tag_slot = tag;
    coefficients[pivot] = 1;
    encode_frame_id(frame_id, suffix).unwrap();
    datagram
}

#[test]
fn test_partial_generation_times_out_with_event() {
    let cfg = ReceiverConfig { mtu: 4, abandon_after_us: 10_000, ..receiver_config(4) };
    let mut receiver = VideoReceiver::new(FullVectorRlnc, cfg).unwrap();

    receiver.on_receive(0, 10, &synthetic_packet(4, 3, 1, 1, 0));
    assert_eq!(receiver.in_flight(), 1);
    assert!(receiver.pop_event().is_none());

    // Quiet past the deadline: the next arrival sweeps the stale state.
    receiver.on_receive(20_000, 20, &synthetic_packet(4, 3, 2, 2, 0));
    assert_eq!(receiver.in_flight(), 1);
    match receiver.pop_event() {
        Some(StreamEvent::GenerationAbandoned { frame_id, tag, rank, symbols }) => {
            assert_eq!(frame_id, 1);
            assert_eq!(tag, 1);
            assert_eq!(rank, 1);
            assert_eq!(symbols, 3);
        }
        other => panic!("expected abandonment, got {:?}", other),
    }
}

#[test]
fn test_in_flight_cap_evicts_the_stalest() {
    let cfg = ReceiverConfig { mtu: 4, max_in_flight: 2, ..receiver_config(4) };
    let mut receiver = VideoReceiver::new(FullVectorRlnc, cfg).unwrap();

    receiver.on_receive(0, 10, &synthetic_packet(4, 3, 1, 1, 0));
    receiver.on_receive(5, 20, &synthetic_packet(4, 3, 2, 2, 0));
    receiver.on_receive(9, 30, &synthetic_packet(4, 3, 3, 3, 0));

    assert_eq!(receiver.in_flight(), 2);
    match receiver.pop_event() {
        Some(StreamEvent::GenerationAbandoned { frame_id, .. }) => assert_eq!(frame_id, 1),
        other => panic!("expected eviction of the oldest, got {:?}", other),
    }
}

#[test]
fn test_malformed_datagrams_are_counted() {
    let mut receiver = VideoReceiver::new(FullVectorRlnc, receiver_config(1400)).unwrap();

    // Too short to carry even one coefficient.
    receiver.on_receive(0, 10, &[0u8; 16]);
    assert_eq!(receiver.malformed(), 1);
    assert_eq!(receiver.received(), 0);
    assert_eq!(receiver.in_flight(), 0);
}

#[test]
fn test_shutdown_flushes_pending_generations() {
    let cfg = ReceiverConfig { mtu: 4, ..receiver_config(4) };
    let mut receiver = VideoReceiver::new(FullVectorRlnc, cfg).unwrap();
    receiver.on_receive(0, 10, &synthetic_packet(4, 2, 1, 1, 0));

    receiver.shutdown();
    assert_eq!(receiver.in_flight(), 0);
    assert!(matches!(
        receiver.pop_event(),
        Some(StreamEvent::GenerationAbandoned { rank: 1, symbols: 2, .. })
    ));
}
