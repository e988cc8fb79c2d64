//! Platform configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/hil-sequencer/` and `~/.local/share/hil-sequencer/`
//! - macOS: `~/Library/Application Support/hil-sequencer/`
//! - Windows: `%APPDATA%\hil-sequencer\`

use std::io;
use std::path::PathBuf;

/// Application name used for all platform directories
const APP_NAME: &str = "hil-sequencer";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the directory holding saved run profiles
pub fn profiles_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("configs"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// Ensure a directory exists, creating parents as needed
pub fn ensure_dir(dir: &std::path::Path) -> io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
