// Configuration loading and local storage

pub mod settings;
pub mod storage;

use std::fmt;
use std::path::PathBuf;

/// Overrides the config directory (tests, portable installs).
pub const CONFIG_DIR_ENV: &str = "RISKVIEW_CONFIG_DIR";

/// Directory holding `settings.json` and `storage.json`.
///
/// `RISKVIEW_CONFIG_DIR` wins over the platform config dir.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|c| c.join("riskview"))
}

#[derive(Debug)]
pub enum ConfigError {
    /// No platform config directory and no override
    NoConfigDir,
    Io(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "could not determine config directory"),
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
