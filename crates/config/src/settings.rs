// Application settings
// Loaded from <config_dir>/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ConfigError;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

pub const API_BASE_ENV: &str = "RISKVIEW_API_BASE";
pub const OUTPUT_DIR_ENV: &str = "RISKVIEW_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Backend
    #[serde(rename = "api.base")]
    pub api_base: String,

    /// Request timeout in seconds. None = wait indefinitely.
    #[serde(rename = "api.timeoutSecs")]
    pub timeout_secs: Option<u64>,

    // Analyze
    #[serde(rename = "analyze.sessionLabelPrefix")]
    pub session_label_prefix: String,

    // Export
    #[serde(rename = "export.outputDir")]
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: None,
            session_label_prefix: "분석 세션".to_string(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> Option<PathBuf> {
        crate::config_dir().map(|d| d.join("settings.json"))
    }

    /// Load settings from the default location, then apply env overrides.
    /// Never fails: unreadable files fall back to defaults.
    pub fn load() -> Self {
        let mut settings = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        };
        settings.apply_env();
        settings
    }

    /// Load settings from an explicit path. `//` comment lines are allowed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                self.api_base = base;
            }
        }
        if let Some(dir) = std::env::var_os(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
    }

    /// Base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Where downloads land: configured dir, else the current directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
