//! Command-line argument parsing for the linestamp binary
//!
//! Flags override values loaded from the config file.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{DetectionMode, LinestampConfig, RendererStrategy};

/// Prefix every line of a file or stream with the time it arrived
#[derive(Parser, Debug)]
#[command(
    name = "linestamp",
    version,
    about = "Prefix every line with the time it arrived"
)]
pub struct CliArgs {
    /// File to read (stdin when omitted)
    #[arg(value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// How line changes are detected
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Poll period in seconds (poll mode)
    #[arg(short = 'p', long, value_name = "SECS")]
    pub period: Option<f64>,

    /// strftime format for timestamps
    #[arg(short = 'f', long, value_name = "FMT", conflicts_with = "elapsed")]
    pub format: Option<String>,

    /// Show time elapsed since start instead of wall-clock time
    #[arg(short = 'e', long)]
    pub elapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Notification,
    Poll,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Notification => DetectionMode::Notification,
            ModeArg::Poll => DetectionMode::Poll,
        }
    }
}

impl CliArgs {
    /// Apply flags on top of a loaded config
    pub fn apply(&self, config: &mut LinestampConfig) {
        if let Some(mode) = self.mode {
            config.detection_mode = mode.into();
        }
        if let Some(period) = self.period {
            config.poll_period_seconds = period;
        }
        if self.elapsed {
            config.renderer = RendererStrategy::Elapsed;
        } else if let Some(format) = &self.format {
            config.renderer = RendererStrategy::Timestamp {
                format: format.clone(),
            };
        }
    }
}
