//! Centralized configuration paths for linestamp
//!
//! All config files live under:
//! - Unix/macOS: `~/.config/linestamp/`
//! - Windows: `%APPDATA%\linestamp\`

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

const APP_DIR: &str = "linestamp";

/// Base config directory for linestamp
///
/// Unix/macOS:
///   - If XDG_CONFIG_HOME is set: `$XDG_CONFIG_HOME/linestamp`
///   - Else: `~/.config/linestamp`
///
/// Windows:
///   - `%APPDATA%\linestamp`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    // Not dirs::config_dir(): on macOS that is ~/Library/Application Support,
    // and the file should sit in ~/.config there as on Linux.
    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `~/.config/linestamp/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `~/.config/linestamp/logs/`
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Ensure logs dir exists, returning it
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir().ok_or(Error::NoConfigDir)?;
    ensure_dir(&logs)?;
    Ok(logs)
}
