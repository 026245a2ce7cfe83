use crate::midi::EndpointId;
use crate::timecode::Timecode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    /// Nothing received yet, or the signal stopped while locking.
    #[default]
    Idle,
    /// Collecting the first full cycle of quarter-frame pieces.
    Locking,
    Running,
    /// The signal paused; the display keeps advancing on wall-clock time.
    Freewheeling,
    /// Freewheeling lasted too long; there is no valid time to show.
    Lost,
}

impl ReceiverState {
    pub fn has_timecode(&self) -> bool {
        matches!(self, ReceiverState::Running | ReceiverState::Freewheeling)
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReceiverState::Idle => "idle",
            ReceiverState::Locking => "locking",
            ReceiverState::Running => "running",
            ReceiverState::Freewheeling => "freewheeling",
            ReceiverState::Lost => "lost",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Piece index expected after `last` when moving this way.
    pub fn next_piece(&self, last: u8) -> u8 {
        match self {
            Direction::Forward => (last + 1) % 8,
            Direction::Reverse => (last + 7) % 8,
        }
    }

    /// Piece index that completes a window.
    pub fn terminal_piece(&self) -> u8 {
        match self {
            Direction::Forward => 7,
            Direction::Reverse => 0,
        }
    }

    pub fn sign(&self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Notifications sent by an [`MtcReceiver`](super::MtcReceiver).
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    StateChanged {
        from: ReceiverState,
        to: ReceiverState,
    },
    /// Timecode started running from `timecode`.
    Started { timecode: Timecode },
    /// A quarter-frame window was assembled; `timecode` is the displayed time.
    Timecode { timecode: Timecode, direction: Direction },
    /// The assembled time did not follow on from the previous window.
    Discontinuity { expected: Timecode, received: Timecode },
    /// Pieces from a second source arrived while locked to `locked`.
    Conflict { locked: Option<EndpointId>, other: Option<EndpointId> },
    /// A full-frame sysex located the receiver.
    FullFrame { timecode: Timecode },
    /// The signal was lost; `last` is the final freewheeled time.
    Stopped { last: Option<Timecode> },
}
