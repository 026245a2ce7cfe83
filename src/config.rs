// config.rs

use crate::cli::Args;
use crate::midi::ParserConfig;
use crate::mtc::ReceiverConfig;
use config::{Config, Environment, File};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "MTCDISPLAY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime settings, layered from defaults, an optional TOML file, the
/// environment and the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sysex_timeout_ms: u64,
    pub ignore_invalid_data: bool,
    pub pull_down: bool,
    pub freewheel_quarter_frames: f64,
    pub lost_after_frames: f64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sysex_timeout_ms: 1000,
            ignore_invalid_data: false,
            pull_down: false,
            freewheel_quarter_frames: 2.5,
            lost_after_frames: 2.0,
            log_level: "debug".to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from `file` (if given and present) and `MTCDISPLAY_*`
    /// environment variables on top of the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies command line overrides.
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ConfigError> {
        if let Some(timeout) = args.sysex_timeout_ms {
            self.sysex_timeout_ms = timeout;
        }
        if args.ignore_invalid {
            self.ignore_invalid_data = true;
        }
        if args.pull_down {
            self.pull_down = true;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sysex_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "sysex_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.freewheel_quarter_frames.is_nan() || self.freewheel_quarter_frames <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "freewheel_quarter_frames",
                reason: format!("{} is not positive", self.freewheel_quarter_frames),
            });
        }
        if self.lost_after_frames.is_nan() || self.lost_after_frames < 0.0 {
            return Err(ConfigError::Invalid {
                name: "lost_after_frames",
                reason: format!("{} is negative", self.lost_after_frames),
            });
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::Invalid {
                name: "log_level",
                reason: format!("unknown level {:?}", self.log_level),
            })
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            sysex_timeout: Duration::from_millis(self.sysex_timeout_ms),
            ignore_invalid_data: self.ignore_invalid_data,
        }
    }

    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            pull_down: self.pull_down,
            freewheel_quarter_frames: self.freewheel_quarter_frames,
            lost_after_frames: self.lost_after_frames,
        }
    }
}
