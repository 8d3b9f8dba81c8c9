use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
    #[serde(default = "default_advance_delay_ms")]
    pub advance_delay_ms: u64,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_audio_base_url")]
    pub audio_base_url: String,
    #[serde(default = "default_audio_suffix")]
    pub audio_suffix: String,
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default = "default_phonetic_rotation_size")]
    pub phonetic_rotation_size: usize,
    /// Text-to-speech program used when a syllable has no recording,
    /// e.g. `espeak-ng -v cmn`.
    #[serde(default)]
    pub speech_command: Option<String>,
    #[serde(default = "default_cache_generation")]
    pub cache_generation: u32,
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,
}

fn default_auto_advance() -> bool {
    true
}
fn default_advance_delay_ms() -> u64 {
    1300
}
fn default_locale() -> String {
    "en".to_string()
}
fn default_audio_base_url() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tingli")
        .join("audio")
        .to_string_lossy()
        .to_string()
}
fn default_audio_suffix() -> String {
    ".mp3".to_string()
}
fn default_phonetic_rotation_size() -> usize {
    40
}
fn default_cache_generation() -> u32 {
    1
}
fn default_static_assets() -> Vec<String> {
    vec!["catalog.json".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_advance: default_auto_advance(),
            advance_delay_ms: default_advance_delay_ms(),
            locale: default_locale(),
            audio_base_url: default_audio_base_url(),
            audio_suffix: default_audio_suffix(),
            catalog_path: None,
            phonetic_rotation_size: default_phonetic_rotation_size(),
            speech_command: None,
            cache_generation: default_cache_generation(),
            static_assets: default_static_assets(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tingli")
            .join("config.toml")
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// Clamp numeric settings into range and reset unknown locales.
    /// Call after deserialization and after applying CLI overrides.
    pub fn validate(&mut self) {
        self.advance_delay_ms = self.advance_delay_ms.clamp(200, 10_000);
        self.phonetic_rotation_size = self.phonetic_rotation_size.clamp(1, 200);
        if !SUPPORTED_LOCALES.contains(&self.locale.as_str()) {
            self.locale = default_locale();
        }
        if self.audio_suffix.is_empty() {
            self.audio_suffix = default_audio_suffix();
        }
        if self.cache_generation == 0 {
            self.cache_generation = default_cache_generation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.auto_advance);
        assert_eq!(config.advance_delay_ms, 1300);
        assert_eq!(config.locale, "en");
        assert_eq!(config.audio_suffix, ".mp3");
        assert_eq!(config.phonetic_rotation_size, 40);
        assert_eq!(config.static_assets, vec!["catalog.json"]);
        assert!(config.audio_base_url.contains("audio"));
        assert!(config.speech_command.is_none());
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
auto_advance = false
locale = "ru"
speech_command = "espeak-ng -v cmn"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.auto_advance);
        assert_eq!(config.locale, "ru");
        assert_eq!(config.speech_command.as_deref(), Some("espeak-ng -v cmn"));
        assert_eq!(config.advance_delay_ms, 1300);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.catalog_path = Some("/tmp/catalog.json".to_string());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut config = Config::default();
        config.advance_delay_ms = 5;
        config.phonetic_rotation_size = 999;
        config.locale = "fr".to_string();
        config.cache_generation = 0;
        config.validate();
        assert_eq!(config.advance_delay_ms, 200);
        assert_eq!(config.phonetic_rotation_size, 200);
        assert_eq!(config.locale, "en");
        assert_eq!(config.cache_generation, 1);
    }

    #[test]
    fn test_validate_keeps_valid_values() {
        let mut config = Config::default();
        config.advance_delay_ms = 2500;
        config.locale = "ru".to_string();
        config.validate();
        assert_eq!(config.advance_delay_ms, 2500);
        assert_eq!(config.locale, "ru");
        assert_eq!(config.advance_delay(), Duration::from_millis(2500));
    }
}
