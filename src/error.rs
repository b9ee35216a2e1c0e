//! Error types

use std::path::PathBuf;

/// Failure reported by an annotation renderer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The timestamp format string contains an unknown specifier
    #[error("invalid timestamp format {0:?}")]
    InvalidFormat(String),
    /// Any other renderer-specific failure
    #[error("{0}")]
    Failed(String),
}

/// Errors surfaced by the engine and its configuration layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("renderer failed: {0}")]
    Render(#[from] RenderError),

    #[error("no config directory available")]
    NoConfigDir,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
