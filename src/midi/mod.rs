//! MIDI input for mtcdisplay
//!
//! This module turns raw MIDI packets into typed messages:
//! - [`MessageParser`] decodes one source's byte stream, handling running
//!   status, interleaved real-time bytes and sysex reassembly
//! - [`InputStream`] keeps one parser per source
//! - [`PacketSource`] implementations deliver packets from hardware
//!   ([`MidirEngine`]) or from a script ([`MockEngine`])
//!
mod engine;
mod input_stream;
mod message;
pub mod midir_engine;
pub mod mock_engine;
mod parser;

pub use engine::{EndpointId, HostClock, MidiError, PacketSink, PacketSource, Result, Timestamp};
pub use input_stream::InputStream;
pub use message::{
    Message, MessageKind, SysExMessage, SystemCommonMessage, SystemCommonType, SystemRealTime,
    VoiceMessage, VoiceStatus,
};
pub use parser::{MessageHandler, MessageParser, ParserConfig, ParserEvent};

pub use midir_engine::MidirEngine;
pub use mock_engine::MockEngine;

#[cfg(not(feature = "test-mock"))]
pub type DefaultEngine = MidirEngine;

#[cfg(feature = "test-mock")]
pub type DefaultEngine = MockEngine;
