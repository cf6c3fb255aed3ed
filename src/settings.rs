use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{ids::ShortIdConfig, weights::WeightUnit};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    pub weight_unit: WeightUnit,
    pub short_id: ShortIdConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("gearpack.sqlite3"),
            log_level: "info".into(),
            weight_unit: WeightUnit::default(),
            short_id: ShortIdConfig::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file yields the defaults;
    /// unknown keys are ignored and absent keys take their default. An
    /// unusable `shortId` block is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings
            .short_id
            .validate()
            .with_context(|| format!("Invalid shortId settings in {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.short_id.length, 8);
        assert_eq!(settings.short_id.max_attempts, 10);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "weightUnit": "oz", "shortId": { "maxAttempts": 3 } }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.weight_unit, WeightUnit::Oz);
        assert_eq!(settings.short_id.max_attempts, 3);
        assert_eq!(settings.short_id.length, 8);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            log_level: "debug".into(),
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.log_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn degenerate_short_id_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        for body in [
            r#"{ "shortId": { "length": 0 } }"#,
            r#"{ "shortId": { "length": 4 } }"#,
            r#"{ "shortId": { "maxAttempts": 0 } }"#,
        ] {
            fs::write(&path, body).unwrap();
            let err = Settings::load(&path).unwrap_err();
            assert!(format!("{err:#}").contains("short id"), "{body}: {err:#}");
        }
    }
}
