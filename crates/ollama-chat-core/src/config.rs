use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::ClientSettings;

/// On-disk settings. Every field is optional; missing ones fall back to
/// the built-in defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Layer `overrides` on top of this config; set fields win.
    pub fn merged(self, overrides: Config) -> Config {
        Config {
            server_url: overrides.server_url.or(self.server_url),
            model: overrides.model.or(self.model),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            server_url: self.server_url.clone().unwrap_or(defaults.server_url),
            model: self.model.clone().unwrap_or(defaults.model),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ollama-chat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());

        let settings = config.client_settings();
        assert_eq!(settings.server_url, "http://localhost:8000");
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.timeout_secs, 60);
    }

    #[test]
    fn save_then_load_keeps_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            server_url: Some("http://127.0.0.1:9000".to_string()),
            model: Some("llama3".to_string()),
            timeout_secs: None,
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.client_settings().timeout_secs, 60);
    }

    #[test]
    fn partial_file_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "model": "phi3" }"#).unwrap();

        let settings = Config::load_from(&path).unwrap().client_settings();
        assert_eq!(settings.model, "phi3");
        assert_eq!(settings.server_url, "http://localhost:8000");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = Config {
            server_url: Some("http://a".to_string()),
            model: Some("m1".to_string()),
            timeout_secs: Some(10),
        };
        let cli = Config {
            model: Some("m2".to_string()),
            ..Config::default()
        };

        let merged = file.merged(cli);
        assert_eq!(merged.server_url.as_deref(), Some("http://a"));
        assert_eq!(merged.model.as_deref(), Some("m2"));
        assert_eq!(merged.timeout_secs, Some(10));
    }
}
