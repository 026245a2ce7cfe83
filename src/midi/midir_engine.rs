use crate::midi::{EndpointId, HostClock, MidiError, PacketSink, PacketSource, Result};
use log::info;
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::sync::Arc;

const CLIENT_NAME: &str = "mtcdisplay";

/// Packet source backed by the system's MIDI inputs.
pub struct MidirEngine {
    clock: HostClock,
    connections: Vec<MidiInputConnection<()>>,
}

impl MidirEngine {
    pub fn new(clock: HostClock) -> Result<Self> {
        // Fail early if the backend is unavailable.
        MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::InitError(e.to_string()))?;
        Ok(MidirEngine {
            clock,
            connections: Vec::new(),
        })
    }

    fn new_input() -> Result<MidiInput> {
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::InitError(e.to_string()))?;
        midi_in.ignore(Ignore::None);
        Ok(midi_in)
    }
}

impl PacketSource for MidirEngine {
    fn source_names(&self) -> Vec<String> {
        let mut names = Vec::new();

        if let Ok(midi_in) = MidiInput::new(CLIENT_NAME) {
            for port in midi_in.ports() {
                if let Ok(name) = midi_in.port_name(&port) {
                    names.push(name);
                }
            }
        }

        names
    }

    fn connect(&mut self, indices: &[usize], sink: Arc<dyn PacketSink>) -> Result<()> {
        for &index in indices {
            // Each connection consumes its own MidiInput.
            let midi_in = Self::new_input()?;
            let ports = midi_in.ports();
            let port = ports
                .get(index)
                .ok_or_else(|| MidiError::SourceNotFound(format!("index {}", index)))?;
            let name = midi_in
                .port_name(port)
                .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

            let origin = EndpointId(index as u32);
            let clock = self.clock;
            let sink = Arc::clone(&sink);
            let connection = midi_in
                .connect(
                    port,
                    &format!("{}-{}", CLIENT_NAME, index),
                    move |_stamp, bytes, _| sink.take_packet(origin, clock.now(), bytes),
                    (),
                )
                .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

            info!("Connected to MIDI source {} ({})", index, name);
            self.connections.push(connection);
        }
        Ok(())
    }
}
