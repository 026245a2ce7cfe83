pub mod cli;
pub mod config;
pub mod logging;
pub mod midi;
pub mod mtc;
pub mod timecode;
pub mod ui;

pub use midi::{Message, MessageHandler, MessageKind, MessageParser, ParserConfig};
pub use mtc::{MtcReceiver, ReceiverConfig, ReceiverEvent, ReceiverState};
pub use timecode::{Framerate, Timecode, TimecodeError};
