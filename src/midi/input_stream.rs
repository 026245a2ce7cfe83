use super::engine::{EndpointId, PacketSink, Timestamp};
use super::parser::{MessageHandler, MessageParser, ParserConfig};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes packets from several sources through one parser per source, so
/// running status and sysex state never mix between them. All parsers feed
/// the same handler.
pub struct InputStream {
    config: ParserConfig,
    handler: Arc<dyn MessageHandler>,
    parsers: Mutex<HashMap<EndpointId, Arc<MessageParser>>>,
}

impl InputStream {
    pub fn new(config: ParserConfig, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            config,
            handler,
            parsers: Mutex::new(HashMap::new()),
        }
    }

    fn parser_for(&self, origin: EndpointId) -> Arc<MessageParser> {
        let mut parsers = self.parsers.lock();
        parsers
            .entry(origin)
            .or_insert_with(|| {
                debug!("Creating parser for source {}", origin.0);
                Arc::new(MessageParser::new(
                    self.config,
                    Some(origin),
                    Arc::clone(&self.handler),
                ))
            })
            .clone()
    }

    /// Abandons unfinished sysex messages on every source. Returns true if
    /// any source was receiving one.
    pub fn cancel_receiving_sysex(&self) -> bool {
        let parsers: Vec<_> = self.parsers.lock().values().cloned().collect();
        parsers
            .iter()
            .fold(false, |cancelled, parser| parser.cancel_receiving_sysex() || cancelled)
    }

    pub fn sources(&self) -> Vec<EndpointId> {
        let mut sources: Vec<_> = self.parsers.lock().keys().copied().collect();
        sources.sort();
        sources
    }
}

impl PacketSink for InputStream {
    fn take_packet(&self, origin: EndpointId, timestamp: Timestamp, bytes: &[u8]) {
        // The map lock is released before parsing so sources don't serialise.
        self.parser_for(origin).take_packet(timestamp, bytes);
    }
}
