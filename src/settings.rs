use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::db::DEFAULT_ACCOUNT;
use crate::error::{Result, RunwayError};

pub const DB_FILE: &str = "runway.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_account")]
    pub default_account: String,
    #[serde(default)]
    pub projection: ProjectionConfig,
}

fn default_account() -> String {
    DEFAULT_ACCOUNT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            default_account: default_account(),
            projection: ProjectionConfig::default(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("runway")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("runway")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Unreadable or malformed files fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RunwayError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForecastMode, Quantile};

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings {
            data_dir: "/tmp/runway-test".to_string(),
            default_account: "Checking".to_string(),
            projection: ProjectionConfig::default(),
        };
        settings.projection.forecast_mode = ForecastMode::MonteCarlo;
        settings.projection.quantile = Quantile::P50;
        save_settings_to(&settings, &path).unwrap();

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.data_dir, "/tmp/runway-test");
        assert_eq!(loaded.default_account, "Checking");
        assert_eq!(loaded.projection.forecast_mode, ForecastMode::MonteCarlo);
        assert_eq!(loaded.projection.quantile, Quantile::P50);
        assert_eq!(loaded.db_path(), PathBuf::from("/tmp/runway-test").join(DB_FILE));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json"));
        assert_eq!(s.default_account, "Default");
        assert!(!s.data_dir.is_empty());
        assert_eq!(s.projection, ProjectionConfig::default());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.default_account, "Default");
        assert_eq!(s.projection.initial_months, 18);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let s = load_settings_from(&path);
        assert_eq!(s.default_account, "Default");
    }
}
