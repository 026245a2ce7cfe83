use super::engine::{EndpointId, Timestamp};
use super::message::{
    Message, MessageKind, SysExMessage, SystemCommonMessage, SystemCommonType, SystemRealTime,
    VoiceMessage, VoiceStatus,
};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Receives the output of a [`MessageParser`].
///
/// Callbacks run on the thread that delivered the packet (or on the sysex
/// watchdog thread) while the parser's lock is held, so they must return
/// quickly and must not call back into the same parser.
pub trait MessageHandler: Send + Sync {
    /// Messages decoded from one call to `take_packets`, in arrival order.
    /// Finished sysex messages are included here as well.
    fn on_messages(&self, messages: &[Message]);

    /// Bytes accumulated so far by an unfinished sysex message.
    fn on_sysex_progress(&self, _bytes_so_far: usize) {}

    /// A sysex message has finished; `valid` is false when it was cut short
    /// by a timeout, a cancel or another status byte.
    fn on_sysex_complete(&self, _message: &Message, _valid: bool) {}
}

/// Parser output as sent over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserEvent {
    Messages(Vec<Message>),
    SysExProgress(usize),
    SysExComplete { message: Message, valid: bool },
}

impl MessageHandler for Sender<ParserEvent> {
    fn on_messages(&self, messages: &[Message]) {
        let _ = self.send(ParserEvent::Messages(messages.to_vec()));
    }

    fn on_sysex_progress(&self, bytes_so_far: usize) {
        let _ = self.send(ParserEvent::SysExProgress(bytes_so_far));
    }

    fn on_sysex_complete(&self, message: &Message, valid: bool) {
        let _ = self.send(ParserEvent::SysExComplete {
            message: message.clone(),
            valid,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    /// How long an unfinished sysex may go without a new byte.
    pub sysex_timeout: Duration,
    /// Drop malformed bytes instead of reporting them as `Invalid`.
    pub ignore_invalid_data: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            sysex_timeout: Duration::from_secs(1),
            ignore_invalid_data: false,
        }
    }
}

struct SysExBuffer {
    data: Vec<u8>,
    started_at: Timestamp,
    deadline: Instant,
}

/// A channel or system common message waiting for its data bytes.
struct PendingMessage {
    status: u8,
    data: Vec<u8>,
    started_at: Option<Timestamp>,
}

#[derive(Default)]
struct ParserState {
    pending: Option<PendingMessage>,
    sysex: Option<SysExBuffer>,
}

struct Shared {
    state: Mutex<ParserState>,
    handler: Arc<dyn MessageHandler>,
    config: ParserConfig,
    origin: Option<EndpointId>,
}

/// Decodes the raw byte stream of one MIDI source into [`Message`]s.
///
/// Running status and partially received messages carry over between calls
/// to [`MessageParser::take_packets`]. Unfinished sysex messages are closed
/// by a watchdog thread once the configured timeout passes without new
/// bytes.
pub struct MessageParser {
    shared: Arc<Shared>,
    wake: Sender<()>,
}

impl MessageParser {
    pub fn new(
        config: ParserConfig,
        origin: Option<EndpointId>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ParserState::default()),
            handler,
            config,
            origin,
        });
        let (wake, wake_rx) = channel::bounded(1);
        let watched = Arc::downgrade(&shared);
        thread::spawn(move || run_sysex_watchdog(watched, wake_rx));

        Self { shared, wake }
    }

    pub fn config(&self) -> ParserConfig {
        self.shared.config
    }

    pub fn origin(&self) -> Option<EndpointId> {
        self.shared.origin
    }

    pub fn take_packet(&self, timestamp: Timestamp, bytes: &[u8]) {
        self.take_packets([(timestamp, bytes)]);
    }

    /// Decodes packets in order and hands the resulting messages to the
    /// handler before returning.
    pub fn take_packets<'a, I>(&self, packets: I)
    where
        I: IntoIterator<Item = (Timestamp, &'a [u8])>,
    {
        let mut state = self.shared.state.lock();
        let sysex_was_active = state.sysex.is_some();
        let mut messages = Vec::new();

        for (timestamp, bytes) in packets {
            for &byte in bytes {
                self.shared
                    .decode_byte(&mut state, timestamp, byte, &mut messages);
            }
            if let Some(sysex) = state.sysex.as_mut() {
                sysex.deadline = Instant::now() + self.shared.config.sysex_timeout;
            }
        }

        self.shared.deliver(&messages);
        if let Some(sysex) = state.sysex.as_ref() {
            self.shared.handler.on_sysex_progress(sysex.data.len() + 1);
            if !sysex_was_active {
                let _ = self.wake.try_send(());
            }
        }
    }

    /// Abandons an unfinished sysex message, delivering what was received.
    /// Returns false if no sysex message was in progress.
    pub fn cancel_receiving_sysex(&self) -> bool {
        let mut state = self.shared.state.lock();
        match state.sysex.take() {
            Some(sysex) => {
                debug!("Sysex cancelled after {} bytes", sysex.data.len() + 1);
                let message = self.shared.sysex_message(sysex, false);
                self.shared.deliver(&[message]);
                true
            }
            None => false,
        }
    }

    pub fn is_receiving_sysex(&self) -> bool {
        self.shared.state.lock().sysex.is_some()
    }
}

impl Shared {
    fn decode_byte(
        &self,
        state: &mut ParserState,
        timestamp: Timestamp,
        byte: u8,
        out: &mut Vec<Message>,
    ) {
        match byte {
            0xF8..=0xFF => match SystemRealTime::from_status_byte(byte) {
                Some(realtime) => {
                    out.push(self.message(timestamp, MessageKind::SystemRealTime(realtime)))
                }
                None => self.invalid(timestamp, vec![byte], out),
            },
            SYSEX_START => {
                self.end_sysex(state, out);
                self.abandon_pending(state, timestamp, out);
                state.pending = None;
                debug!("Sysex started");
                state.sysex = Some(SysExBuffer {
                    data: Vec::new(),
                    started_at: timestamp,
                    deadline: Instant::now() + self.config.sysex_timeout,
                });
            }
            SYSEX_END => match state.sysex.take() {
                Some(sysex) => {
                    debug!("Sysex finished, {} bytes", sysex.data.len() + 2);
                    out.push(self.sysex_message(sysex, true));
                }
                None => self.invalid(timestamp, vec![byte], out),
            },
            0x80..=0xF6 => {
                self.end_sysex(state, out);
                self.abandon_pending(state, timestamp, out);
                state.pending = None;
                if let Some(kind) = SystemCommonType::from_status_byte(byte) {
                    if kind.data_length() == 0 {
                        out.push(self.system_common(timestamp, kind, &[]));
                    } else {
                        state.pending = Some(PendingMessage {
                            status: byte,
                            data: Vec::with_capacity(2),
                            started_at: Some(timestamp),
                        });
                    }
                } else if VoiceStatus::from_status_byte(byte).is_some() {
                    state.pending = Some(PendingMessage {
                        status: byte,
                        data: Vec::with_capacity(2),
                        started_at: Some(timestamp),
                    });
                } else {
                    // 0xF4 and 0xF5 are undefined
                    self.invalid(timestamp, vec![byte], out);
                }
            }
            data => {
                if let Some(sysex) = state.sysex.as_mut() {
                    sysex.data.push(data);
                    return;
                }
                match state.pending.as_mut() {
                    Some(pending) => {
                        let started_at = *pending.started_at.get_or_insert(timestamp);
                        pending.data.push(data);
                        if let Some(message) = self.complete_pending(pending, started_at) {
                            out.push(message);
                            pending.data.clear();
                            pending.started_at = None;
                            if pending.status >= 0xF0 {
                                state.pending = None;
                            }
                        }
                    }
                    None => self.invalid(timestamp, vec![data], out),
                }
            }
        }
    }

    fn complete_pending(&self, pending: &PendingMessage, started_at: Timestamp) -> Option<Message> {
        if let Some(kind) = SystemCommonType::from_status_byte(pending.status) {
            return (pending.data.len() == kind.data_length())
                .then(|| self.system_common(started_at, kind, &pending.data));
        }
        let status = VoiceStatus::from_status_byte(pending.status)?;
        if pending.data.len() < status.data_length() {
            return None;
        }
        let voice = VoiceMessage {
            status,
            channel: (pending.status & 0x0F) + 1,
            data1: pending.data[0],
            data2: pending.data.get(1).copied().unwrap_or(0),
        };
        Some(self.message(started_at, MessageKind::Voice(voice)))
    }

    /// A status byte interrupted a message that was still waiting for data.
    fn abandon_pending(&self, state: &ParserState, timestamp: Timestamp, out: &mut Vec<Message>) {
        if let Some(pending) = state.pending.as_ref() {
            if !pending.data.is_empty() || pending.started_at.is_some() {
                let mut raw = vec![pending.status];
                raw.extend_from_slice(&pending.data);
                self.invalid(pending.started_at.unwrap_or(timestamp), raw, out);
            }
        }
    }

    fn end_sysex(&self, state: &mut ParserState, out: &mut Vec<Message>) {
        if let Some(sysex) = state.sysex.take() {
            debug!("Sysex interrupted after {} bytes", sysex.data.len() + 1);
            out.push(self.sysex_message(sysex, false));
        }
    }

    /// Closes the unfinished sysex if its deadline has passed; otherwise
    /// returns the deadline still in force.
    fn expire_sysex(&self, now: Instant) -> Option<Instant> {
        let mut state = self.state.lock();
        let deadline = state.sysex.as_ref()?.deadline;
        if deadline > now {
            return Some(deadline);
        }
        let sysex = state.sysex.take()?;
        debug!("Sysex timed out after {} bytes", sysex.data.len() + 1);
        let message = self.sysex_message(sysex, false);
        self.deliver(&[message]);
        None
    }

    fn deliver(&self, messages: &[Message]) {
        if messages.is_empty() {
            return;
        }
        trace!("Delivering {} messages", messages.len());
        self.handler.on_messages(messages);
        for message in messages {
            if let MessageKind::SystemExclusive(sysex) = &message.kind {
                self.handler.on_sysex_complete(message, sysex.complete);
            }
        }
    }

    fn sysex_message(&self, sysex: SysExBuffer, complete: bool) -> Message {
        self.message(
            sysex.started_at,
            MessageKind::SystemExclusive(SysExMessage {
                data: sysex.data,
                complete,
            }),
        )
    }

    fn system_common(&self, timestamp: Timestamp, kind: SystemCommonType, data: &[u8]) -> Message {
        self.message(
            timestamp,
            MessageKind::SystemCommon(SystemCommonMessage {
                kind,
                data1: data.first().copied().unwrap_or(0),
                data2: data.get(1).copied().unwrap_or(0),
            }),
        )
    }

    fn invalid(&self, timestamp: Timestamp, raw: Vec<u8>, out: &mut Vec<Message>) {
        if self.config.ignore_invalid_data {
            trace!("Ignoring invalid MIDI data {:02X?}", raw);
            return;
        }
        debug!("Invalid MIDI data {:02X?}", raw);
        out.push(self.message(timestamp, MessageKind::Invalid(raw)));
    }

    fn message(&self, timestamp: Timestamp, kind: MessageKind) -> Message {
        Message::new(timestamp, self.origin, kind)
    }
}

fn run_sysex_watchdog(shared: Weak<Shared>, wake: Receiver<()>) {
    let mut deadline: Option<Instant> = None;
    loop {
        let signal = match deadline {
            Some(deadline) => wake.recv_deadline(deadline),
            None => wake.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        if let Err(RecvTimeoutError::Disconnected) = signal {
            return;
        }
        let Some(shared) = shared.upgrade() else {
            return;
        };
        deadline = shared.expire_sysex(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_parser(ignore_invalid_data: bool) -> (MessageParser, Receiver<ParserEvent>) {
        let (tx, rx) = channel::unbounded();
        let config = ParserConfig {
            sysex_timeout: Duration::from_millis(50),
            ignore_invalid_data,
        };
        (MessageParser::new(config, Some(EndpointId(3)), Arc::new(tx)), rx)
    }

    fn messages(rx: &Receiver<ParserEvent>) -> Vec<Message> {
        rx.try_iter()
            .filter_map(|event| match event {
                ParserEvent::Messages(messages) => Some(messages),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn test_two_byte_voice_message() {
        let (parser, rx) = new_parser(false);
        parser.take_packet(10, &[0xC5, 0x11, 0x12]);
        let kinds: Vec<_> = messages(&rx).into_iter().map(|m| m.kind).collect();
        assert_eq!(kinds.len(), 2);
        match &kinds[0] {
            MessageKind::Voice(voice) => {
                assert_eq!(voice.status, VoiceStatus::Program);
                assert_eq!(voice.channel, 6);
                assert_eq!(voice.data1, 0x11);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(kinds[1], MessageKind::Voice(_)));
    }

    #[test]
    fn test_stray_data_is_invalid_or_ignored() {
        let (parser, rx) = new_parser(false);
        parser.take_packet(0, &[0x40]);
        assert_eq!(messages(&rx)[0].kind, MessageKind::Invalid(vec![0x40]));

        let (parser, rx) = new_parser(true);
        parser.take_packet(0, &[0x40, 0x41]);
        assert!(messages(&rx).is_empty());
    }

    #[test]
    fn test_system_common_clears_running_status() {
        let (parser, rx) = new_parser(false);
        parser.take_packet(0, &[0x90, 0x40, 0x7F, 0xF1, 0x21, 0x40]);
        let kinds: Vec<_> = messages(&rx).into_iter().map(|m| m.kind).collect();
        assert_eq!(kinds.len(), 3);
        match &kinds[1] {
            MessageKind::SystemCommon(common) => assert_eq!(common.quarter_frame(), Some((2, 1))),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(kinds[2], MessageKind::Invalid(vec![0x40]));
    }

    #[test]
    fn test_message_carries_origin_and_start_time() {
        let (parser, rx) = new_parser(false);
        parser.take_packet(100, &[0xB0, 0x07]);
        parser.take_packet(200, &[0x64]);
        let received = messages(&rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].timestamp, 100);
        assert_eq!(received[0].origin, Some(EndpointId(3)));
    }

    #[test]
    fn test_status_interrupting_sysex_ends_it_incomplete() {
        let (parser, rx) = new_parser(false);
        parser.take_packet(0, &[0xF0, 0x01, 0x02, 0x90, 0x40, 0x7F]);
        let received = messages(&rx);
        assert_eq!(received.len(), 2);
        assert_eq!(
            received[0].kind,
            MessageKind::SystemExclusive(SysExMessage {
                data: vec![0x01, 0x02],
                complete: false
            })
        );
        assert!(!parser.is_receiving_sysex());
    }

    #[test]
    fn test_cancel_without_sysex_is_noop() {
        let (parser, rx) = new_parser(false);
        assert!(!parser.cancel_receiving_sysex());
        assert!(rx.try_recv().is_err());
    }
}
