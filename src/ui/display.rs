use super::progress::create_timecode_spinner;
use crate::mtc::{MtcReceiver, ReceiverEvent, ReceiverState};
use crate::timecode::Framerate;
use chrono::Local;
use crossbeam::channel::Receiver;
use log::{info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_millis(10);

/// The spinner line: timecode, framerate and receiver state.
pub fn format_status(
    timecode: &str,
    framerate: Option<Framerate>,
    state: ReceiverState,
    conflict: bool,
) -> String {
    let rate = framerate
        .map(|rate| format!("{} fps", rate))
        .unwrap_or_else(|| "-- fps".to_string());
    let mut status = format!("{}  {}  {}", timecode, rate, state);
    if conflict {
        status.push_str("  (multiple MTC sources!)");
    }
    status
}

/// A log line for an event, or None for events too frequent to print.
pub fn describe_event(event: &ReceiverEvent) -> Option<String> {
    match event {
        ReceiverEvent::Timecode { .. } => None,
        ReceiverEvent::StateChanged { from, to } => Some(format!("{} -> {}", from, to)),
        ReceiverEvent::Started { timecode } => Some(format!(
            "Started at {}",
            timecode.string_representation_with_bits_and_framerate()
        )),
        ReceiverEvent::Discontinuity { expected, received } => Some(format!(
            "Discontinuity: expected {}, received {}",
            expected, received
        )),
        ReceiverEvent::Conflict { locked, other } => Some(format!(
            "Conflict: MTC from {:?} while locked to {:?}",
            other, locked
        )),
        ReceiverEvent::FullFrame { timecode } => Some(format!(
            "Located to {}",
            timecode.string_representation_with_bits_and_framerate()
        )),
        ReceiverEvent::Stopped { last } => Some(match last {
            Some(tc) => format!("Stopped at {}", tc),
            None => "Stopped".to_string(),
        }),
    }
}

/// Polls the receiver and redraws the status line until `running` clears.
pub fn run_display(
    receiver: Arc<MtcReceiver>,
    events: Receiver<ReceiverEvent>,
    running: Arc<AtomicBool>,
) {
    let pb = create_timecode_spinner();

    while running.load(Ordering::SeqCst) {
        receiver.poll();

        for event in events.try_iter() {
            match describe_event(&event) {
                Some(line) => {
                    info!("{}", line);
                    pb.println(format!("{} {}", Local::now().format("%H:%M:%S%.3f"), line));
                }
                None => trace!("{:?}", event),
            }
        }

        pb.set_message(format_status(
            &receiver.timecode_string(),
            receiver.framerate(),
            receiver.state(),
            receiver.conflict(),
        ));

        thread::sleep(REFRESH_INTERVAL);
    }

    pb.finish_and_clear();
}
