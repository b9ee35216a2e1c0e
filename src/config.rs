//! Linestamp configuration persistence
//!
//! Stores preferences in `~/.config/linestamp/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::config_paths;
use crate::error::{Error, Result};
use crate::poll::MIN_POLL_PERIOD;
use crate::render::{
    validate_time_format, ElapsedRenderer, Placeholder, Renderer, TimestampRenderer,
    DEFAULT_TIME_FORMAT,
};

/// How buffer changes are detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Reconcile on every edit notification
    #[default]
    Notification,
    /// Also run an idle timer that fills gaps at the buffer tail
    Poll,
}

/// Which renderer produces annotation text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RendererStrategy {
    /// Wall-clock time with a `strftime` format
    Timestamp {
        #[serde(default = "default_time_format")]
        format: String,
    },
    /// Time since the renderer was created, `+HH:MM:SS`
    Elapsed,
}

impl Default for RendererStrategy {
    fn default() -> Self {
        RendererStrategy::Timestamp {
            format: default_time_format(),
        }
    }
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_poll_period() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Linestamp configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinestampConfig {
    #[serde(default)]
    pub detection_mode: DetectionMode,

    /// Idle poll period in seconds
    #[serde(default = "default_poll_period")]
    pub poll_period_seconds: f64,

    #[serde(default)]
    pub renderer: RendererStrategy,

    /// Blank placeholders as wide as a real annotation
    #[serde(default = "default_true")]
    pub placeholder_width_matches_timestamp: bool,

    /// Placeholder text when widths are not matched
    #[serde(default)]
    pub placeholder: String,
}

impl Default for LinestampConfig {
    fn default() -> Self {
        Self {
            detection_mode: DetectionMode::default(),
            poll_period_seconds: default_poll_period(),
            renderer: RendererStrategy::default(),
            placeholder_width_matches_timestamp: true,
            placeholder: String::new(),
        }
    }
}

impl LinestampConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_paths::config_file().ok_or(Error::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a specific file, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            config_paths::ensure_dir(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Poll period, clamped to the minimum the timer accepts
    pub fn poll_period(&self) -> Duration {
        if !self.poll_period_seconds.is_finite() || self.poll_period_seconds <= 0.0 {
            return MIN_POLL_PERIOD;
        }
        Duration::from_secs_f64(self.poll_period_seconds).max(MIN_POLL_PERIOD)
    }

    pub fn placeholder_policy(&self) -> Placeholder {
        if self.placeholder_width_matches_timestamp {
            Placeholder::MatchWidth
        } else {
            Placeholder::Fixed(self.placeholder.clone())
        }
    }

    /// Build the configured renderer.
    ///
    /// Rejects timestamp formats with unknown specifiers up front.
    pub fn build_renderer(&self) -> Result<Box<dyn Renderer>> {
        let placeholder = self.placeholder_policy();
        let renderer: Box<dyn Renderer> = match &self.renderer {
            RendererStrategy::Timestamp { format } => {
                validate_time_format(format)?;
                Box::new(TimestampRenderer::new(format.clone()).with_placeholder(placeholder))
            }
            RendererStrategy::Elapsed => {
                Box::new(ElapsedRenderer::new().with_placeholder(placeholder))
            }
        };
        Ok(renderer)
    }
}
