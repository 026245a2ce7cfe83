//! Terminal display
//!
//! Shows the received timecode, framerate and receiver state on an
//! indicatif spinner, with receiver events printed above it.

mod display;
mod progress;

pub use display::{describe_event, format_status, run_display};
pub use progress::create_timecode_spinner;
