//! Configuration file handling for the CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use postura_common::config::{config_file_path, AppConfig};
use postura_core::config::ClassifierConfig;

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppConfig,
    pub classifier: ClassifierConfig,

    /// File the settings were read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `explicit` or the standard location.
    ///
    /// A missing file at the standard location yields defaults. A file named
    /// explicitly must exist. Parse and validation failures are errors.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => config_file_path(),
        };

        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let mut settings = Self::parse(&content)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        settings.source = Some(path);
        Ok(settings)
    }

    /// Parse and validate settings JSON.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let settings: Self = serde_json::from_str(content)?;
        settings.classifier.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Log where the active settings came from.
    pub fn log_source(&self) {
        match &self.source {
            Some(path) => tracing::debug!(path = %path.display(), "Loaded configuration"),
            None => tracing::info!("No configuration file found, using defaults"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_core::matcher::MatchStrategy;

    #[test]
    fn test_parse_partial_settings() {
        let settings = Settings::parse(
            r#"{ "app": { "dataset_path": "data/ref.csv" },
                 "classifier": { "strategy": "threshold_bands" } }"#,
        )
        .unwrap();
        assert_eq!(settings.app.dataset_path, PathBuf::from("data/ref.csv"));
        assert_eq!(settings.classifier.strategy, MatchStrategy::ThresholdBands);
        assert_eq!(settings.classifier.history_size, 5);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(Settings::parse(r#"{ "classifier": { "history_size": 0 } }"#).is_err());
        assert!(Settings::parse("not json").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join("postura_test_settings");
        let path = dir.join("nested").join("config.json");
        let _ = std::fs::remove_dir_all(&dir);

        let mut settings = Settings::default();
        settings.classifier.history_size = 9;
        settings.save(&path).unwrap();

        let loaded = Settings::load(Some(&path)).unwrap();
        assert_eq!(loaded.classifier.history_size, 9);
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let path = std::env::temp_dir().join("postura_test_settings_missing.json");
        let _ = std::fs::remove_file(&path);
        assert!(Settings::load(Some(&path)).is_err());
    }
}
