use clap::Parser;
use dialoguer::{theme::ColorfulTheme, MultiSelect};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Display MIDI Time Code received from MIDI sources", long_about = None)]
pub struct Args {
    /// List available MIDI sources
    #[arg(long)]
    pub list_sources: bool,

    /// Listen to sources whose name contains NAME (repeatable)
    #[arg(long, value_name = "NAME")]
    pub source: Vec<String>,

    /// Pick sources interactively
    #[arg(long, conflicts_with = "source")]
    pub choose: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Milliseconds without data before an unfinished sysex is abandoned
    #[arg(long, value_name = "MS")]
    pub sysex_timeout_ms: Option<u64>,

    /// Silently drop malformed MIDI data
    #[arg(long)]
    pub ignore_invalid: bool,

    /// Treat incoming MTC as video speed (23.976, 24.975, 29.97)
    #[arg(long)]
    pub pull_down: bool,
}

/// Resolves each requested name to the index of the first source containing
/// it. Every name must match.
pub fn validate_sources(requested: &[String], sources: &[String]) -> Result<Vec<usize>, String> {
    let mut indices = Vec::new();
    for name in requested {
        match sources.iter().position(|s| s.contains(name.as_str())) {
            Some(index) if !indices.contains(&index) => indices.push(index),
            Some(_) => {}
            None => {
                let mut error_msg =
                    format!("Error: Source '{}' not found in available sources:\n", name);
                for source in sources {
                    error_msg.push_str(&format!("  - {}\n", source));
                }
                return Err(error_msg);
            }
        }
    }
    Ok(indices)
}

/// Asks the user which sources to listen to.
pub fn choose_sources(sources: &[String]) -> Result<Vec<usize>, dialoguer::Error> {
    MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select MIDI sources (space to toggle, enter to confirm)")
        .items(sources)
        .interact()
}
