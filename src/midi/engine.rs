use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Host time in microseconds since a [`HostClock`] epoch.
pub type Timestamp = u64;

/// Identity of the endpoint a packet arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub u32);

/// Errors raised by packet sources
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI initialisation error: {0}")]
    InitError(String),
    #[error("MIDI connection error: {0}")]
    ConnectionError(String),
    #[error("MIDI source not found: {0}")]
    SourceNotFound(String),
}

pub type Result<T> = std::result::Result<T, MidiError>;

/// Receives raw packets from a packet source.
pub trait PacketSink: Send + Sync {
    fn take_packet(&self, origin: EndpointId, timestamp: Timestamp, bytes: &[u8]);
}

/// A source of raw MIDI packets, such as a set of hardware input ports.
pub trait PacketSource: Send {
    /// Names of the sources that can be connected.
    fn source_names(&self) -> Vec<String>;

    /// Connects to the sources at `indices` and starts delivering their
    /// packets to `sink`. Each source gets its index as its [`EndpointId`].
    fn connect(&mut self, indices: &[usize], sink: Arc<dyn PacketSink>) -> Result<()>;
}

/// Monotonic microsecond clock shared by packet delivery and the receiver.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    epoch: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.epoch.elapsed().as_micros() as Timestamp
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}
