use crate::midi::{EndpointId, MidiError, PacketSink, PacketSource, Result, Timestamp};
use std::sync::Arc;

/// One scripted packet: source index, timestamp and bytes.
pub type ScriptedPacket = (usize, Timestamp, Vec<u8>);

/// Packet source that replays a fixed script synchronously on `connect`.
pub struct MockEngine {
    names: Vec<String>,
    script: Vec<ScriptedPacket>,
}

impl MockEngine {
    pub fn new(script: Vec<ScriptedPacket>) -> Self {
        MockEngine {
            names: vec!["Mock Source 1".to_string(), "Mock Source 2".to_string()],
            script,
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PacketSource for MockEngine {
    fn source_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn connect(&mut self, indices: &[usize], sink: Arc<dyn PacketSink>) -> Result<()> {
        if let Some(&missing) = indices.iter().find(|&&i| i >= self.names.len()) {
            return Err(MidiError::SourceNotFound(format!("index {}", missing)));
        }
        for (index, timestamp, bytes) in &self.script {
            if indices.contains(index) {
                sink.take_packet(EndpointId(*index as u32), *timestamp, bytes);
            }
        }
        Ok(())
    }
}
