//! Application settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use at_detect::{DetectorConfig, ScannerConfig};
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Sweep timings and candidate baud rates
    pub detector: DetectorConfig,
    /// Which enumerated ports to skip
    pub scanner: ScannerConfig,
}

impl Settings {
    /// Get the XDG config directory for at-scan
    /// Uses $XDG_CONFIG_HOME/at-scan, falls back to ~/.config/at-scan
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("at-scan"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("at-scan"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("at-scan-settings-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "detector": { "baud_rates": [115200] }, "scanner": { "skip_patterns": [] } }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.detector.baud_rates, [115200]);
        assert_eq!(settings.detector.read_timeout_ms, 1000);
        assert!(settings.scanner.skip_patterns.is_empty());
        assert!(settings.scanner.skip_bluetooth);
    }

    #[test]
    fn test_load_from_invalid_file_names_path() {
        let path = std::env::temp_dir().join(format!("at-scan-bad-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(err.to_string().contains("failed to parse"));
    }
}
