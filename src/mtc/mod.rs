//! MIDI Time Code reception
//!
//! [`MtcReceiver`] consumes parsed MIDI messages, assembles quarter-frame
//! pieces into a [`Timecode`](crate::timecode::Timecode) and tracks the
//! signal through the Idle, Locking, Running, Freewheeling and Lost states.

mod receiver;
mod state;

pub use receiver::{MtcReceiver, ReceiverConfig};
pub use state::{Direction, ReceiverEvent, ReceiverState};
