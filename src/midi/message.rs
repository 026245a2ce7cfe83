use super::engine::{EndpointId, Timestamp};

/// A decoded MIDI message with the time and source it arrived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub timestamp: Timestamp,
    pub origin: Option<EndpointId>,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(timestamp: Timestamp, origin: Option<EndpointId>, kind: MessageKind) -> Self {
        Self {
            timestamp,
            origin,
            kind,
        }
    }

    pub fn is_realtime(&self) -> bool {
        matches!(self.kind, MessageKind::SystemRealTime(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Voice(VoiceMessage),
    SystemCommon(SystemCommonMessage),
    SystemRealTime(SystemRealTime),
    SystemExclusive(SysExMessage),
    /// Bytes that could not be interpreted.
    Invalid(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    NoteOff,
    NoteOn,
    Aftertouch,
    Control,
    Program,
    ChannelPressure,
    PitchWheel,
}

impl VoiceStatus {
    pub fn from_status_byte(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(VoiceStatus::NoteOff),
            0x90 => Some(VoiceStatus::NoteOn),
            0xA0 => Some(VoiceStatus::Aftertouch),
            0xB0 => Some(VoiceStatus::Control),
            0xC0 => Some(VoiceStatus::Program),
            0xD0 => Some(VoiceStatus::ChannelPressure),
            0xE0 => Some(VoiceStatus::PitchWheel),
            _ => None,
        }
    }

    pub fn status_nibble(&self) -> u8 {
        match self {
            VoiceStatus::NoteOff => 0x80,
            VoiceStatus::NoteOn => 0x90,
            VoiceStatus::Aftertouch => 0xA0,
            VoiceStatus::Control => 0xB0,
            VoiceStatus::Program => 0xC0,
            VoiceStatus::ChannelPressure => 0xD0,
            VoiceStatus::PitchWheel => 0xE0,
        }
    }

    pub fn data_length(&self) -> usize {
        match self {
            VoiceStatus::Program | VoiceStatus::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// A channel voice message; `channel` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceMessage {
    pub status: VoiceStatus,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl VoiceMessage {
    pub fn status_byte(&self) -> u8 {
        self.status.status_nibble() | (self.channel.saturating_sub(1) & 0x0F)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommonType {
    TimeCodeQuarterFrame,
    SongPositionPointer,
    SongSelect,
    TuneRequest,
}

impl SystemCommonType {
    pub fn from_status_byte(status: u8) -> Option<Self> {
        match status {
            0xF1 => Some(SystemCommonType::TimeCodeQuarterFrame),
            0xF2 => Some(SystemCommonType::SongPositionPointer),
            0xF3 => Some(SystemCommonType::SongSelect),
            0xF6 => Some(SystemCommonType::TuneRequest),
            _ => None,
        }
    }

    pub fn status_byte(&self) -> u8 {
        match self {
            SystemCommonType::TimeCodeQuarterFrame => 0xF1,
            SystemCommonType::SongPositionPointer => 0xF2,
            SystemCommonType::SongSelect => 0xF3,
            SystemCommonType::TuneRequest => 0xF6,
        }
    }

    pub fn data_length(&self) -> usize {
        match self {
            SystemCommonType::TimeCodeQuarterFrame | SystemCommonType::SongSelect => 1,
            SystemCommonType::SongPositionPointer => 2,
            SystemCommonType::TuneRequest => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCommonMessage {
    pub kind: SystemCommonType,
    pub data1: u8,
    pub data2: u8,
}

impl SystemCommonMessage {
    /// Piece index and value nibble of a quarter-frame message.
    pub fn quarter_frame(&self) -> Option<(u8, u8)> {
        match self.kind {
            SystemCommonType::TimeCodeQuarterFrame => Some(((self.data1 >> 4) & 0x07, self.data1 & 0x0F)),
            _ => None,
        }
    }

    /// 14-bit song position, in MIDI beats.
    pub fn song_position(&self) -> Option<u16> {
        match self.kind {
            SystemCommonType::SongPositionPointer => {
                Some((self.data1 as u16 & 0x7F) | ((self.data2 as u16 & 0x7F) << 7))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRealTime {
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSense,
    Reset,
}

impl SystemRealTime {
    pub fn from_status_byte(status: u8) -> Option<Self> {
        match status {
            0xF8 => Some(SystemRealTime::Clock),
            0xFA => Some(SystemRealTime::Start),
            0xFB => Some(SystemRealTime::Continue),
            0xFC => Some(SystemRealTime::Stop),
            0xFE => Some(SystemRealTime::ActiveSense),
            0xFF => Some(SystemRealTime::Reset),
            _ => None,
        }
    }

    pub fn status_byte(&self) -> u8 {
        match self {
            SystemRealTime::Clock => 0xF8,
            SystemRealTime::Start => 0xFA,
            SystemRealTime::Continue => 0xFB,
            SystemRealTime::Stop => 0xFC,
            SystemRealTime::ActiveSense => 0xFE,
            SystemRealTime::Reset => 0xFF,
        }
    }
}

/// System exclusive payload, without the F0/F7 delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysExMessage {
    pub data: Vec<u8>,
    /// True when the message was terminated by F7, false on timeout or abort.
    pub complete: bool,
}

impl SysExMessage {
    /// Number of bytes received on the wire, delimiters included.
    pub fn received_length(&self) -> usize {
        self.data.len() + if self.complete { 2 } else { 1 }
    }

    pub fn manufacturer_id(&self) -> Option<&[u8]> {
        match self.data.first()? {
            0x00 if self.data.len() >= 3 => Some(&self.data[..3]),
            0x00 => None,
            _ => Some(&self.data[..1]),
        }
    }
}
