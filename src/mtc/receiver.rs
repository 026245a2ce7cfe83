use super::state::{Direction, ReceiverEvent, ReceiverState};
use crate::midi::{
    EndpointId, HostClock, Message, MessageHandler, MessageKind, SystemRealTime, Timestamp,
};
use crate::timecode::{Framerate, Timecode, INVALID_TIMECODE_STRING};
use crossbeam::channel::Sender;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;

/// Frames covered by one cycle of eight quarter-frame pieces.
const FRAMES_PER_WINDOW: i64 = 2;

/// Quarter frames between the first and the terminal piece of a cycle.
const TERMINAL_PIECE_OFFSET: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceiverConfig {
    /// Derive 23.976, 24.975 and 29.97 from the transmitted rate index.
    pub pull_down: bool,
    /// Quarter-frame intervals without a piece before freewheeling.
    pub freewheel_quarter_frames: f64,
    /// Frames of freewheeling before the signal counts as lost.
    pub lost_after_frames: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            pull_down: false,
            freewheel_quarter_frames: 2.5,
            lost_after_frames: 2.0,
        }
    }
}

/// Pieces of the quarter-frame cycle under assembly.
#[derive(Debug, Default)]
struct Window {
    pieces: [u8; 8],
    received: u8,
    foreign_piece: bool,
}

impl Window {
    fn insert(&mut self, index: u8, nibble: u8) {
        if self.received == 0 {
            // foreign pieces seen before this window started belong to the last one
            self.foreign_piece = false;
        }
        self.pieces[index as usize] = nibble;
        self.received |= 1 << index;
    }

    fn is_full(&self) -> bool {
        self.received == 0xFF
    }

    fn clear(&mut self) {
        *self = Window::default();
    }
}

/// The source the receiver is following and the rate it announced.
#[derive(Debug, Clone, Copy)]
struct Lock {
    origin: Option<EndpointId>,
    rate_index: Option<u8>,
}

/// Displayed time at a reference instant, from which the display extrapolates.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    timecode: Timecode,
    at: Timestamp,
}

struct Inner {
    config: ReceiverConfig,
    events: Sender<ReceiverEvent>,
    state: ReceiverState,
    direction: Direction,
    window: Window,
    last_index: Option<u8>,
    last_piece_at: Option<Timestamp>,
    lock: Option<Lock>,
    assembled: Option<Timecode>,
    anchor: Option<Anchor>,
    located: Option<Timecode>,
    conflict: bool,
}

/// Reconstructs a running timecode from MTC quarter-frame messages.
///
/// Feed it parsed messages through [`MessageHandler`] and call
/// [`MtcReceiver::poll`] regularly so that freewheeling and signal loss are
/// noticed when no messages arrive. State changes are reported on the event
/// channel given at construction.
pub struct MtcReceiver {
    clock: HostClock,
    inner: Mutex<Inner>,
}

impl MtcReceiver {
    pub fn new(config: ReceiverConfig, clock: HostClock, events: Sender<ReceiverEvent>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                config,
                events,
                state: ReceiverState::Idle,
                direction: Direction::Forward,
                window: Window::default(),
                last_index: None,
                last_piece_at: None,
                lock: None,
                assembled: None,
                anchor: None,
                located: None,
                conflict: false,
            }),
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.inner.lock().state
    }

    pub fn direction(&self) -> Direction {
        self.inner.lock().direction
    }

    /// True while a second source is sending pieces alongside the locked one.
    pub fn conflict(&self) -> bool {
        self.inner.lock().conflict
    }

    /// Framerate of the most recently assembled window.
    pub fn framerate(&self) -> Option<Framerate> {
        self.inner.lock().known_framerate()
    }

    /// The digits of the most recent complete window, as transmitted.
    pub fn assembled_timecode(&self) -> Option<Timecode> {
        self.inner.lock().assembled
    }

    pub fn current_timecode(&self) -> Option<Timecode> {
        self.current_timecode_at(self.clock.now())
    }

    /// The time to display at host time `now`.
    pub fn current_timecode_at(&self, now: Timestamp) -> Option<Timecode> {
        self.inner.lock().displayed_at(now)
    }

    /// The current timecode as a string, or the invalid placeholder.
    pub fn timecode_string(&self) -> String {
        self.timecode_string_at(self.clock.now())
    }

    pub fn timecode_string_at(&self, now: Timestamp) -> String {
        match self.current_timecode_at(now) {
            Some(tc) => tc.string_representation(),
            None => INVALID_TIMECODE_STRING.to_string(),
        }
    }

    /// Checks the signal timeouts; call this from the display loop.
    pub fn poll(&self) {
        self.poll_at(self.clock.now());
    }

    pub fn poll_at(&self, now: Timestamp) {
        self.inner.lock().check_timeouts(now);
    }

    /// Forgets everything and returns to Idle.
    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn take_quarter_frame(
        &self,
        piece: u8,
        nibble: u8,
        timestamp: Timestamp,
        origin: Option<EndpointId>,
    ) {
        self.inner
            .lock()
            .take_quarter_frame(piece & 0x07, nibble & 0x0F, timestamp, origin);
    }
}

impl MessageHandler for MtcReceiver {
    fn on_messages(&self, messages: &[Message]) {
        let mut inner = self.inner.lock();
        for message in messages {
            match &message.kind {
                MessageKind::SystemCommon(common) => {
                    if let Some((piece, nibble)) = common.quarter_frame() {
                        inner.take_quarter_frame(piece, nibble, message.timestamp, message.origin);
                    }
                }
                MessageKind::SystemExclusive(sysex) if sysex.complete => {
                    let pull_down = inner.config.pull_down;
                    if let Some(tc) = Timecode::from_mtc_full_frame(&sysex.data, pull_down) {
                        inner.take_full_frame(tc, message.timestamp);
                    }
                }
                MessageKind::SystemRealTime(SystemRealTime::Reset) => inner.reset(),
                _ => {}
            }
        }
    }
}

impl Inner {
    fn take_quarter_frame(
        &mut self,
        index: u8,
        nibble: u8,
        timestamp: Timestamp,
        origin: Option<EndpointId>,
    ) {
        trace!("Quarter frame {} = {:X} from {:?}", index, nibble, origin);
        match self.lock {
            Some(lock) if lock.origin != origin => {
                self.window.foreign_piece = true;
                if !self.conflict {
                    warn!(
                        "Quarter frames from {:?} while locked to {:?}",
                        origin, lock.origin
                    );
                    self.conflict = true;
                    self.send(ReceiverEvent::Conflict {
                        locked: lock.origin,
                        other: origin,
                    });
                }
                return;
            }
            Some(_) => {}
            None => {
                self.lock = Some(Lock {
                    origin,
                    rate_index: None,
                });
                self.clear_assembly();
                self.set_state(ReceiverState::Locking);
            }
        }

        if index == 7 && !self.accept_rate((nibble >> 1) & 0x03) {
            self.resync("rate change");
        } else if let Some(last) = self.last_index {
            if index == self.direction.next_piece(last) {
                // continuing
            } else if let Some(reversed) = self.reversal(last, index) {
                debug!("Direction changed to {:?}", reversed);
                if self.state.has_timecode() {
                    self.anchor = self
                        .displayed_at(timestamp)
                        .map(|timecode| Anchor { timecode, at: timestamp });
                }
                self.direction = reversed;
                if self.window.received != 1 << last {
                    self.window.clear();
                }
                self.assembled = None;
            } else {
                self.resync("missed or reordered piece");
            }
        }

        self.window.insert(index, nibble);
        self.last_index = Some(index);
        self.last_piece_at = Some(timestamp);
        if self.state == ReceiverState::Freewheeling {
            self.set_state(ReceiverState::Running);
        }

        if index == self.direction.terminal_piece() {
            if self.window.is_full() {
                self.complete_window(timestamp);
            }
            self.window.clear();
        }
    }

    /// Records the rate index of piece 7; false if it differs from the one
    /// already locked.
    fn accept_rate(&mut self, rate_index: u8) -> bool {
        let Some(lock) = self.lock.as_mut() else {
            return true;
        };
        match lock.rate_index {
            Some(locked) if locked != rate_index => {
                lock.rate_index = Some(rate_index);
                false
            }
            _ => {
                lock.rate_index = Some(rate_index);
                true
            }
        }
    }

    fn reversal(&self, last: u8, index: u8) -> Option<Direction> {
        let other = match self.direction {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        };
        (index == other.next_piece(last)).then_some(other)
    }

    fn resync(&mut self, reason: &str) {
        warn!("MTC resync: {}", reason);
        self.window.clear();
        self.last_index = None;
        self.set_state(ReceiverState::Locking);
    }

    fn complete_window(&mut self, timestamp: Timestamp) {
        let Some(assembled) = Timecode::from_mtc_pieces(&self.window.pieces, self.config.pull_down)
        else {
            return;
        };
        let step = FRAMES_PER_WINDOW * self.direction.sign();

        if self.state.has_timecode() {
            if let Some(previous) = self.assembled {
                let mut expected = previous;
                expected.add_frames(step);
                if expected != assembled || previous.framerate() != assembled.framerate() {
                    warn!("MTC discontinuity: expected {}, got {}", expected, assembled);
                    self.send(ReceiverEvent::Discontinuity {
                        expected,
                        received: assembled,
                    });
                }
            }
        }

        if self.conflict && !self.window.foreign_piece {
            info!("Conflicting MTC source went quiet");
            self.conflict = false;
        }

        // The terminal piece arrives seven quarter frames after the time the
        // digits describe.
        let mut displayed = assembled;
        displayed.add_seconds(
            self.direction.sign() as f64
                * TERMINAL_PIECE_OFFSET
                * assembled.framerate().quarter_frame_duration(),
        );
        self.assembled = Some(assembled);
        self.anchor = Some(Anchor {
            timecode: displayed,
            at: timestamp,
        });

        if !self.state.has_timecode() {
            self.located = None;
            self.set_state(ReceiverState::Running);
            info!("MTC started at {}", assembled.string_representation_with_bits_and_framerate());
            self.send(ReceiverEvent::Started {
                timecode: displayed,
            });
        }
        self.send(ReceiverEvent::Timecode {
            timecode: displayed,
            direction: self.direction,
        });
    }

    fn take_full_frame(&mut self, timecode: Timecode, timestamp: Timestamp) {
        info!("MTC full frame {}", timecode.string_representation_with_bits_and_framerate());
        self.clear_assembly();
        self.lock = None;
        self.assembled = None;
        self.anchor = None;
        self.located = Some(timecode);
        self.last_piece_at = Some(timestamp);
        self.set_state(ReceiverState::Locking);
        self.send(ReceiverEvent::FullFrame { timecode });
    }

    fn check_timeouts(&mut self, now: Timestamp) {
        let Some(last) = self.last_piece_at else {
            return;
        };
        let elapsed = now.saturating_sub(last) as f64 / 1_000_000.0;
        let framerate = self.timing_framerate();
        let freewheel_after =
            self.config.freewheel_quarter_frames * framerate.quarter_frame_duration();
        let lost_after = freewheel_after + self.config.lost_after_frames * framerate.frame_duration();

        match self.state {
            ReceiverState::Running if elapsed > freewheel_after => {
                self.set_state(ReceiverState::Freewheeling);
                if elapsed > lost_after {
                    self.lose(now);
                }
            }
            ReceiverState::Freewheeling if elapsed > lost_after => self.lose(now),
            ReceiverState::Locking if elapsed > lost_after => {
                debug!("No MTC while locking");
                self.clear_assembly();
                self.lock = None;
                self.last_piece_at = None;
                self.set_state(ReceiverState::Idle);
            }
            _ => {}
        }
    }

    fn lose(&mut self, now: Timestamp) {
        let last = self.displayed_at(now);
        self.clear_assembly();
        self.lock = None;
        self.assembled = None;
        self.anchor = None;
        self.located = None;
        self.last_piece_at = None;
        self.conflict = false;
        self.set_state(ReceiverState::Lost);
        info!("MTC stopped at {}", last.map(|tc| tc.to_string()).unwrap_or_default());
        self.send(ReceiverEvent::Stopped { last });
    }

    fn reset(&mut self) {
        self.clear_assembly();
        self.lock = None;
        self.assembled = None;
        self.anchor = None;
        self.located = None;
        self.last_piece_at = None;
        self.conflict = false;
        self.direction = Direction::Forward;
        self.set_state(ReceiverState::Idle);
    }

    fn clear_assembly(&mut self) {
        self.window.clear();
        self.last_index = None;
    }

    fn known_framerate(&self) -> Option<Framerate> {
        self.assembled
            .or(self.anchor.map(|anchor| anchor.timecode))
            .map(|tc| tc.framerate())
    }

    /// Rate used to measure timeouts: the last assembled one, else the locked
    /// rate index, else 30 fps.
    fn timing_framerate(&self) -> Framerate {
        self.known_framerate()
            .or_else(|| {
                self.lock
                    .and_then(|lock| lock.rate_index)
                    .and_then(|index| Framerate::from_mtc_index(index, self.config.pull_down))
            })
            .unwrap_or_default()
    }

    fn displayed_at(&self, now: Timestamp) -> Option<Timecode> {
        if !self.state.has_timecode() {
            return match self.state {
                ReceiverState::Idle | ReceiverState::Locking => self.located,
                _ => None,
            };
        }
        let anchor = self.anchor?;
        let elapsed = now.saturating_sub(anchor.at) as f64 / 1_000_000.0;
        let mut tc = anchor.timecode;
        match self.direction {
            Direction::Forward => tc.add_seconds(elapsed),
            Direction::Reverse => tc.subtract_seconds(elapsed),
        }
        Some(tc)
    }

    fn set_state(&mut self, to: ReceiverState) {
        let from = self.state;
        if from == to {
            return;
        }
        info!("MTC receiver {} -> {}", from, to);
        self.state = to;
        self.send(ReceiverEvent::StateChanged { from, to });
    }

    fn send(&self, event: ReceiverEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
