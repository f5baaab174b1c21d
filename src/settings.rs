use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{ApiConfig, DEFAULT_API_BASE_URL};
use crate::store::StoreOptions;
use crate::theme::{DEFAULT_COLOR_LIST, ThemePreset, is_hex_color};
use crate::types::DEFAULT_TASK_COLOR;

pub const API_URL_ENV: &str = "TODO_DECK_API_URL";

const DEFAULT_THEME: &str = "system";
const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub theme: String,
    pub color_list: Vec<String>,
    pub default_task_color: String,
    pub done_last: bool,
    pub pinned_first: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            theme: DEFAULT_THEME.to_string(),
            color_list: default_color_list(),
            default_task_color: DEFAULT_TASK_COLOR.to_string(),
            done_last: true,
            pinned_first: true,
        }
    }
}

fn default_color_list() -> Vec<String> {
    DEFAULT_COLOR_LIST.iter().map(|color| color.to_string()).collect()
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("todo-deck");
        path.push("settings.toml");
        Some(path)
    }

    /// Loads the config file, then applies the environment override.
    pub fn load() -> Self {
        let mut settings = match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            settings.override_api_url(&url);
        }
        settings
    }

    pub(crate) fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    pub(crate) fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid settings config path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize settings to TOML")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid settings config file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary settings file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to atomically rename settings file '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn override_api_url(&mut self, url: &str) {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return;
        }
        self.api_base_url = trimmed.to_string();
    }

    pub fn theme_preset(&self) -> ThemePreset {
        ThemePreset::from_str(&self.theme).unwrap_or_default()
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            palette: self.color_list.clone(),
            default_task_color: self.default_task_color.clone(),
        }
    }

    fn validate(&mut self) {
        self.request_timeout_ms = self
            .request_timeout_ms
            .clamp(MIN_REQUEST_TIMEOUT_MS, MAX_REQUEST_TIMEOUT_MS);

        if self.api_base_url.trim().is_empty() {
            warn!("empty api_base_url in settings config; falling back to default");
            self.api_base_url = DEFAULT_API_BASE_URL.to_string();
        }

        self.theme = match ThemePreset::from_str(&self.theme) {
            Ok(preset) => preset.as_str().to_string(),
            Err(()) => {
                warn!(
                    "invalid theme '{}' in settings config; falling back to default",
                    self.theme
                );
                DEFAULT_THEME.to_string()
            }
        };

        let before = self.color_list.len();
        self.color_list.retain(|color| is_hex_color(color));
        if self.color_list.len() != before {
            warn!(
                "dropped {} invalid entries from color_list in settings config",
                before - self.color_list.len()
            );
        }
        if self.color_list.is_empty() {
            self.color_list = default_color_list();
        }

        if !is_hex_color(&self.default_task_color) {
            warn!(
                "invalid default_task_color '{}' in settings config; falling back to {}",
                self.default_task_color, DEFAULT_TASK_COLOR
            );
            self.default_task_color = DEFAULT_TASK_COLOR.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_file_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("todo-deck").join("settings.toml")
    }

    fn write_settings(temp_dir: &TempDir, contents: &str) -> PathBuf {
        let path = settings_file_path(temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(&path, contents).expect("failed to write settings");
        path
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.theme, "system");
        assert_eq!(settings.request_timeout_ms, 10_000);
        assert_eq!(settings.color_list.len(), 13);
        assert_eq!(settings.default_task_color, "#88c9f2");
        assert!(settings.done_last);
        assert!(settings.pinned_first);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let settings = Settings::load_from_path(&settings_file_path(&temp_dir));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = write_settings(&temp_dir, "theme = \"dark\"\nrequest_timeout_ms = [invalid");

        let settings = Settings::load_from_path(&path);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = write_settings(
            &temp_dir,
            "api_base_url = \"http://tasks.internal:8000/api/\"\ndone_last = false",
        );

        let settings = Settings::load_from_path(&path);
        assert_eq!(settings.api_base_url, "http://tasks.internal:8000/api/");
        assert!(!settings.done_last);
        assert!(settings.pinned_first);
        assert_eq!(settings.theme, DEFAULT_THEME);
        assert_eq!(settings.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        let mut expected = Settings {
            api_base_url: "http://localhost:9000/api/".to_string(),
            request_timeout_ms: 2_500,
            theme: "dark".to_string(),
            color_list: vec!["#FF69B4".to_string(), "#5061FF".to_string()],
            default_task_color: "#ffffff".to_string(),
            done_last: false,
            pinned_first: true,
        };
        expected.validate();

        expected
            .save_to_path(&path)
            .expect("failed to save settings for roundtrip test");
        let loaded = Settings::load_from_path(&path);

        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_validate_clamps_timeout() {
        let mut settings = Settings {
            request_timeout_ms: 1,
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.request_timeout_ms, MIN_REQUEST_TIMEOUT_MS);

        settings.request_timeout_ms = u64::MAX;
        settings.validate();
        assert_eq!(settings.request_timeout_ms, MAX_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn test_validate_invalid_theme_and_colors() {
        let mut settings = Settings {
            theme: "retro-wave".to_string(),
            color_list: vec!["red".to_string()],
            default_task_color: "blue".to_string(),
            ..Settings::default()
        };

        settings.validate();

        assert_eq!(settings.theme, "system");
        assert_eq!(settings.color_list, default_color_list());
        assert_eq!(settings.default_task_color, DEFAULT_TASK_COLOR);
    }

    #[test]
    fn test_validate_theme_alias() {
        let mut settings = Settings {
            theme: "night".to_string(),
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.theme_preset(), ThemePreset::Dark);
    }

    #[test]
    fn test_override_api_url_ignores_blank() {
        let mut settings = Settings::default();
        settings.override_api_url("   ");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);

        settings.override_api_url(" http://example.test/api/ ");
        assert_eq!(settings.api_base_url, "http://example.test/api/");
        assert_eq!(settings.api_config().base_url, "http://example.test/api/");
    }

    #[test]
    fn test_atomic_write_creates_dirs() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);

        Settings::default()
            .save_to_path(&path)
            .expect("failed to save settings to nested path");

        assert!(path.exists());
        assert!(!path.with_file_name(".settings.toml.tmp").exists());
    }
}
