//! Configuration and artifact directory paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/chain-tester/` and `~/.local/share/chain-tester/`
//! - macOS: `~/Library/Application Support/chain-tester/`

use std::io;
use std::path::PathBuf;

const APP_NAME: &str = "chain-tester";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Default directory for capture artifacts
///
/// Falls back to the system temp dir when no project data dir is available.
pub fn default_capture_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("captures"))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("captures"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(dir: &PathBuf) -> io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_dir_is_valid() {
        let dir = default_capture_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
