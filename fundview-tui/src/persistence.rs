//! UI preferences persisted across restarts as JSON.
//!
//! Only preferences live here. The selection and the analysis cache belong to
//! one session and are never written out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fundview_core::{DisplayMode, Settings};

/// Analysis parameters are only stored once the user changed them, so an
/// unset value leaves the configured default alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub last_username: String,
    pub display_mode: DisplayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_beta: Option<bool>,
}

impl Preferences {
    /// Seed the analysis defaults of `settings` from the stored preferences.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(days) = self.days_to_predict.filter(|d| *d > 0) {
            settings.default_days_to_predict = days;
        }
        if let Some(use_beta) = self.use_beta {
            settings.default_use_beta = use_beta;
        }
    }
}

pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fundview")
        .join("preferences.json")
}

/// Load preferences. Returns defaults if the file is missing or corrupt.
pub fn load(path: &Path) -> Preferences {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt preferences");
            Preferences::default()
        }),
        Err(_) => Preferences::default(),
    }
}

/// Save preferences, creating parent directories if needed.
pub fn save(path: &Path, prefs: &Preferences) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(prefs)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let prefs = Preferences {
            last_username: "analyst".into(),
            display_mode: DisplayMode::Chart,
            days_to_predict: Some(10),
            use_beta: Some(false),
        };
        save(&path, &prefs).unwrap();
        assert_eq!(load(&path), prefs);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("absent.json")), Preferences::default());
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert_eq!(load(&path), Preferences::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{"last_username":"kim"}"#).unwrap();
        let prefs = load(&path);
        assert_eq!(prefs.last_username, "kim");
        assert_eq!(prefs.days_to_predict, None);
    }

    #[test]
    fn analysis_defaults_seed_settings() {
        let mut settings = Settings::default();
        let prefs = Preferences {
            days_to_predict: Some(20),
            use_beta: Some(false),
            ..Preferences::default()
        };
        prefs.apply_to(&mut settings);
        assert_eq!(settings.default_days_to_predict, 20);
        assert!(!settings.default_use_beta);
    }

    #[test]
    fn configured_defaults_survive_without_preferences_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings =
            Settings::from_toml("default_days_to_predict = 12\ndefault_use_beta = false\n").unwrap();
        load(&dir.path().join("absent.json")).apply_to(&mut settings);
        assert_eq!(settings.default_days_to_predict, 12);
        assert!(!settings.default_use_beta);
    }

    #[test]
    fn stored_file_without_parameters_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        save(&path, &Preferences {
            last_username: "kim".into(),
            ..Preferences::default()
        })
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("days_to_predict"));

        let mut settings = Settings::from_toml("default_days_to_predict = 12").unwrap();
        load(&path).apply_to(&mut settings);
        assert_eq!(settings.default_days_to_predict, 12);
        assert!(settings.default_use_beta);
    }
}
