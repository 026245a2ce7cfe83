use crossbeam::channel::{self, Receiver};
use mtcdisplay::midi::{EndpointId, HostClock, InputStream, PacketSink, ParserConfig, Timestamp};
use mtcdisplay::mtc::{Direction, MtcReceiver, ReceiverConfig, ReceiverEvent, ReceiverState};
use mtcdisplay::timecode::{Framerate, Timecode, INVALID_TIMECODE_STRING};
use std::sync::Arc;

/// Quarter-frame spacing at 25 fps, in microseconds.
const QF_25: Timestamp = 10_000;

struct Harness {
    receiver: Arc<MtcReceiver>,
    events: Receiver<ReceiverEvent>,
    stream: InputStream,
}

impl Harness {
    fn new(config: ReceiverConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let (tx, events) = channel::unbounded();
        let receiver = Arc::new(MtcReceiver::new(config, HostClock::new(), tx));
        let stream = InputStream::new(ParserConfig::default(), receiver.clone());
        Harness {
            receiver,
            events,
            stream,
        }
    }

    fn send_piece(&self, origin: u32, at: Timestamp, piece: u8, nibble: u8) {
        self.stream
            .take_packet(EndpointId(origin), at, &[0xF1, piece << 4 | nibble]);
    }

    /// Sends one full cycle of pieces for `tc`, returning the time after it.
    fn send_window(&self, origin: u32, tc: &Timecode, start: Timestamp, direction: Direction) -> Timestamp {
        let pieces = tc.to_mtc_pieces();
        let order: Vec<u8> = match direction {
            Direction::Forward => (0..8).collect(),
            Direction::Reverse => (0..8).rev().collect(),
        };
        let mut at = start;
        for piece in order {
            self.send_piece(origin, at, piece, pieces[piece as usize]);
            at += QF_25;
        }
        at
    }

    fn drain(&self) -> Vec<ReceiverEvent> {
        self.events.try_iter().collect()
    }
}

fn tc25(hh: i64, mm: i64, ss: i64, ff: i64) -> Timecode {
    Timecode::new(Framerate::FPS_25, hh, mm, ss, ff)
}

fn state_changes(events: &[ReceiverEvent]) -> Vec<(ReceiverState, ReceiverState)> {
    events
        .iter()
        .filter_map(|event| match event {
            ReceiverEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_forward_assembly_reaches_running() {
    let h = Harness::new(ReceiverConfig::default());
    assert_eq!(h.receiver.state(), ReceiverState::Idle);

    let tc = tc25(1, 2, 3, 4);
    let next = h.send_window(0, &tc, 0, Direction::Forward);
    let last_piece_at = next - QF_25;

    assert_eq!(h.receiver.state(), ReceiverState::Running);
    assert_eq!(h.receiver.direction(), Direction::Forward);
    assert_eq!(h.receiver.framerate(), Some(Framerate::FPS_25));
    let assembled = h.receiver.assembled_timecode().unwrap();
    assert_eq!(assembled.string_representation(), "1:02:03:04");
    assert_eq!(h.receiver.timecode_string_at(last_piece_at), "1:02:03:05");

    let events = h.drain();
    assert_eq!(
        state_changes(&events),
        vec![
            (ReceiverState::Idle, ReceiverState::Locking),
            (ReceiverState::Locking, ReceiverState::Running)
        ]
    );
    assert!(events.iter().any(|e| matches!(e, ReceiverEvent::Started { .. })));
}

#[test]
fn test_continuous_forward_windows() {
    let h = Harness::new(ReceiverConfig::default());
    let mut tc = tc25(0, 59, 59, 20);
    let mut at = 0;
    for _ in 0..4 {
        at = h.send_window(0, &tc, at, Direction::Forward);
        tc.add_frames(2);
    }
    assert_eq!(h.receiver.state(), ReceiverState::Running);
    assert_eq!(
        h.receiver.assembled_timecode().unwrap().string_representation(),
        "1:00:00:01"
    );
    let events = h.drain();
    assert!(!events.iter().any(|e| matches!(e, ReceiverEvent::Discontinuity { .. })));
    let windows = events
        .iter()
        .filter(|e| matches!(e, ReceiverEvent::Timecode { .. }))
        .count();
    assert_eq!(windows, 4);
}

#[test]
fn test_reverse_tracking() {
    let h = Harness::new(ReceiverConfig::default());
    let mut tc = tc25(0, 10, 0, 10);
    let mut at = 0;
    for _ in 0..3 {
        at = h.send_window(0, &tc, at, Direction::Reverse);
        tc.subtract_frames(2);
    }
    assert_eq!(h.receiver.state(), ReceiverState::Running);
    assert_eq!(h.receiver.direction(), Direction::Reverse);
    assert_eq!(
        h.receiver.assembled_timecode().unwrap().string_representation(),
        "0:10:00:06"
    );
    assert_eq!(h.receiver.timecode_string_at(at - QF_25), "0:10:00:04");
    assert!(!h
        .drain()
        .iter()
        .any(|e| matches!(e, ReceiverEvent::Discontinuity { .. })));
}

#[test]
fn test_reversal_mid_window_keeps_display_continuous() {
    let h = Harness::new(ReceiverConfig::default());
    let at = h.send_window(0, &tc25(1, 0, 0, 0), 0, Direction::Forward);
    let pieces = tc25(1, 0, 0, 2).to_mtc_pieces();
    for piece in 0..4u8 {
        h.send_piece(0, at + piece as Timestamp * QF_25, piece, pieces[piece as usize]);
    }
    let turn = at + 3 * QF_25;
    let before = h.receiver.timecode_string_at(turn);
    assert_eq!(before, "1:00:00:02");

    h.send_piece(0, turn, 2, pieces[2]);
    assert_eq!(h.receiver.state(), ReceiverState::Running);
    assert_eq!(h.receiver.direction(), Direction::Reverse);
    assert_eq!(h.receiver.timecode_string_at(turn), before);
    assert_eq!(h.receiver.timecode_string_at(turn + 4 * QF_25), "1:00:00:01");
    assert_eq!(h.receiver.framerate(), Some(Framerate::FPS_25));
    assert!(!h
        .drain()
        .iter()
        .any(|e| matches!(e, ReceiverEvent::Discontinuity { .. })));
}

#[test]
fn test_silence_freewheels_then_loses_signal() {
    let h = Harness::new(ReceiverConfig::default());
    let next = h.send_window(0, &tc25(1, 2, 3, 4), 0, Direction::Forward);
    let last = next - QF_25;
    h.drain();

    // 2.5 quarter frames at 25 fps is 25 ms.
    h.receiver.poll_at(last + 20_000);
    assert_eq!(h.receiver.state(), ReceiverState::Running);

    h.receiver.poll_at(last + 30_000);
    assert_eq!(h.receiver.state(), ReceiverState::Freewheeling);
    assert_eq!(h.receiver.timecode_string_at(last + 80_000), "1:02:03:07");

    // Lost after a further two frames (80 ms).
    h.receiver.poll_at(last + 100_000);
    assert_eq!(h.receiver.state(), ReceiverState::Freewheeling);
    h.receiver.poll_at(last + 110_000);
    assert_eq!(h.receiver.state(), ReceiverState::Lost);
    assert_eq!(h.receiver.timecode_string_at(last + 110_000), INVALID_TIMECODE_STRING);
    assert_eq!(h.receiver.current_timecode_at(last + 110_000), None);

    let events = h.drain();
    assert_eq!(
        state_changes(&events),
        vec![
            (ReceiverState::Running, ReceiverState::Freewheeling),
            (ReceiverState::Freewheeling, ReceiverState::Lost)
        ]
    );
    assert!(matches!(events.last(), Some(ReceiverEvent::Stopped { last: Some(_) })));
}

#[test]
fn test_late_poll_passes_through_freewheeling() {
    let h = Harness::new(ReceiverConfig::default());
    let next = h.send_window(0, &tc25(0, 0, 10, 0), 0, Direction::Forward);
    h.drain();

    h.receiver.poll_at(next + 1_000_000);
    assert_eq!(h.receiver.state(), ReceiverState::Lost);
    assert_eq!(
        state_changes(&h.drain()),
        vec![
            (ReceiverState::Running, ReceiverState::Freewheeling),
            (ReceiverState::Freewheeling, ReceiverState::Lost)
        ]
    );
}

#[test]
fn test_lost_relocks_on_next_piece() {
    let h = Harness::new(ReceiverConfig::default());
    let next = h.send_window(0, &tc25(0, 0, 10, 0), 0, Direction::Forward);
    h.receiver.poll_at(next + 1_000_000);
    assert_eq!(h.receiver.state(), ReceiverState::Lost);

    let restart = next + 2_000_000;
    h.send_piece(0, restart, 0, 0);
    assert_eq!(h.receiver.state(), ReceiverState::Locking);
    h.send_window(0, &tc25(0, 5, 0, 0), restart + QF_25, Direction::Forward);
    assert_eq!(h.receiver.state(), ReceiverState::Running);
}

#[test]
fn test_missed_piece_resyncs() {
    let h = Harness::new(ReceiverConfig::default());
    let tc = tc25(0, 1, 0, 0);
    let at = h.send_window(0, &tc, 0, Direction::Forward);
    assert_eq!(h.receiver.state(), ReceiverState::Running);

    let pieces = tc.to_mtc_pieces();
    h.send_piece(0, at, 0, pieces[0]);
    h.send_piece(0, at + QF_25, 2, pieces[2]);
    assert_eq!(h.receiver.state(), ReceiverState::Locking);
}

#[test]
fn test_discontinuity_is_reported() {
    let h = Harness::new(ReceiverConfig::default());
    let at = h.send_window(0, &tc25(0, 1, 0, 0), 0, Direction::Forward);
    h.drain();
    h.send_window(0, &tc25(0, 1, 0, 10), at, Direction::Forward);

    assert_eq!(h.receiver.state(), ReceiverState::Running);
    let events = h.drain();
    let discontinuity = events.iter().find_map(|e| match e {
        ReceiverEvent::Discontinuity { expected, received } => Some((*expected, *received)),
        _ => None,
    });
    let (expected, received) = discontinuity.expect("discontinuity event");
    assert_eq!(expected.string_representation(), "0:01:00:02");
    assert_eq!(received.string_representation(), "0:01:00:10");
}

#[test]
fn test_second_source_raises_conflict() {
    let h = Harness::new(ReceiverConfig::default());
    let mut tc = tc25(2, 0, 0, 0);
    let mut at = h.send_window(0, &tc, 0, Direction::Forward);
    tc.add_frames(2);
    assert!(!h.receiver.conflict());

    // A looped-back copy of the same signal arriving on another source.
    let pieces = tc.to_mtc_pieces();
    for piece in 0..8u8 {
        h.send_piece(0, at, piece, pieces[piece as usize]);
        h.send_piece(1, at + 500, piece, pieces[piece as usize]);
        at += QF_25;
    }
    assert!(h.receiver.conflict());
    assert_eq!(h.receiver.state(), ReceiverState::Running);
    assert_eq!(
        h.receiver.assembled_timecode().unwrap().string_representation(),
        "2:00:00:02"
    );
    let conflicts: Vec<_> = h
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ReceiverEvent::Conflict { .. }))
        .collect();
    assert_eq!(
        conflicts,
        vec![ReceiverEvent::Conflict {
            locked: Some(EndpointId(0)),
            other: Some(EndpointId(1))
        }]
    );

    // Once the copy stops, a clean window clears the flag.
    tc.add_frames(2);
    h.send_window(0, &tc, at, Direction::Forward);
    assert!(!h.receiver.conflict());
}

#[test]
fn test_pull_down_selects_video_speed() {
    let h = Harness::new(ReceiverConfig {
        pull_down: true,
        ..ReceiverConfig::default()
    });
    let tc = Timecode::new(Framerate::FPS_30_DF, 0, 1, 0, 4);
    h.send_window(0, &tc, 0, Direction::Forward);
    assert_eq!(h.receiver.framerate(), Some(Framerate::FPS_29_97_DF));
    assert_eq!(
        h.receiver.assembled_timecode().unwrap().string_representation(),
        "0:01:00;04"
    );
}

#[test]
fn test_full_frame_locates() {
    let h = Harness::new(ReceiverConfig::default());
    // 25 fps is rate index 1, in bits 5-6 of the hours byte.
    let hours = (1 << 5) | 10;
    h.stream.take_packet(
        EndpointId(0),
        0,
        &[0xF0, 0x7F, 0x7F, 0x01, 0x01, hours, 20, 30, 12, 0xF7],
    );
    assert_eq!(h.receiver.state(), ReceiverState::Locking);
    assert_eq!(h.receiver.timecode_string_at(0), "10:20:30:12");
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, ReceiverEvent::FullFrame { timecode } if timecode.framerate() == Framerate::FPS_25)));
}

#[test]
fn test_reset_message_returns_to_idle() {
    let h = Harness::new(ReceiverConfig::default());
    h.send_window(0, &tc25(0, 0, 1, 0), 0, Direction::Forward);
    assert_eq!(h.receiver.state(), ReceiverState::Running);

    h.stream.take_packet(EndpointId(0), 90_000, &[0xFF]);
    assert_eq!(h.receiver.state(), ReceiverState::Idle);
    assert_eq!(h.receiver.current_timecode_at(90_000), None);
}
