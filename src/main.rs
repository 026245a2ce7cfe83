use clap::Parser;
use crossbeam::channel;
use mtcdisplay::{
    cli::{choose_sources, validate_sources, Args},
    config::Settings,
    logging,
    midi::{DefaultEngine, HostClock, InputStream, MessageHandler, PacketSource},
    mtc::MtcReceiver,
    ui::run_display,
};
use std::error::Error;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn main() {
    let args = parse_command_line_arguments();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => exit_with_error(&format!("Error loading settings: {}", e)),
    };
    initialize_logging(&settings);

    if let Err(e) = run(&args, &settings) {
        exit_with_error(&e.to_string());
    }
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn load_settings(args: &Args) -> Result<Settings, Box<dyn Error>> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_args(args)?;
    Ok(settings)
}

fn initialize_logging(settings: &Settings) {
    let level = settings.log_level_filter().unwrap_or(log::LevelFilter::Debug);
    if let Err(e) = logging::init_logger(level) {
        // Fall back to stderr so nothing is silently lost.
        let _ = env_logger::Builder::new().filter_level(level).try_init();
        log::warn!("File logging unavailable: {}", e);
    }
    log::info!("Application starting");
}

#[cfg(not(feature = "test-mock"))]
fn open_engine(clock: HostClock) -> mtcdisplay::midi::Result<DefaultEngine> {
    DefaultEngine::new(clock)
}

#[cfg(feature = "test-mock")]
fn open_engine(_clock: HostClock) -> mtcdisplay::midi::Result<DefaultEngine> {
    Ok(DefaultEngine::default())
}

fn list_available_sources(sources: &[String]) {
    println!("Available MIDI sources:");
    for source in sources {
        println!("  - {}", source);
    }
}

fn select_sources(args: &Args, sources: &[String]) -> Result<Vec<usize>, Box<dyn Error>> {
    if args.choose {
        return Ok(choose_sources(sources)?);
    }
    if args.source.is_empty() {
        return Ok((0..sources.len()).collect());
    }
    Ok(validate_sources(&args.source, sources)?)
}

fn run(args: &Args, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let clock = HostClock::new();
    let mut engine = open_engine(clock)?;
    let sources = engine.source_names();

    if args.list_sources {
        list_available_sources(&sources);
        return Ok(());
    }

    let selected = select_sources(args, &sources)?;
    if selected.is_empty() {
        return Err("No MIDI sources selected".into());
    }
    for &index in &selected {
        log::info!("Listening to {}", sources[index]);
        println!("Listening to {}", sources[index]);
    }

    let (event_tx, event_rx) = channel::unbounded();
    let receiver = Arc::new(MtcReceiver::new(settings.receiver_config(), clock, event_tx));
    let handler: Arc<dyn MessageHandler> = receiver.clone();
    let stream = Arc::new(InputStream::new(settings.parser_config(), handler));
    engine.connect(&selected, stream)?;

    log::info!("Display running. Press Ctrl+C to exit...");
    println!("\nPress Ctrl+C to exit...");
    run_display(receiver, event_rx, Arc::new(AtomicBool::new(true)));
    Ok(())
}

fn exit_with_error(message: &str) -> ! {
    log::error!("{}", message);
    eprintln!("{}", message);
    process::exit(1);
}
