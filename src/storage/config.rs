use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calendar::DEFAULT_COLOR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid {key} '{format}': unknown strftime specifier")]
    InvalidFormat { key: &'static str, format: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    pub date_format: String,
    pub time_format: String,
    pub default_color: String,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_format("ui.date_format", &self.ui.date_format)?;
        check_format("ui.time_format", &self.ui.time_format)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("collendar")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api.timeout_seconds.max(1))
    }
}

fn check_format(key: &'static str, format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidFormat {
            key,
            format: format.to_string(),
        });
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = Self::config_dir();

        Self {
            api: ApiConfig {
                base_url: "http://localhost:8081".to_string(),
                timeout_seconds: 10,
            },
            session: SessionConfig {
                file: config_dir.join("session.json"),
            },
            cache: CacheConfig {
                enabled: true,
                path: config_dir.join("cache.db"),
            },
            ui: UiConfig {
                date_format: "%d/%m/%Y".to_string(),
                time_format: "%H:%M".to_string(),
                default_color: DEFAULT_COLOR.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_points_at_local_backend() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8081");
        assert_eq!(config.api.timeout_seconds, 10);
    }

    #[test]
    fn default_config_enables_cache() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert!(config.cache.path.ends_with("cache.db"));
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r##"
            [api]
            base_url = "http://10.0.2.2:8081"
            timeout_seconds = 30

            [session]
            file = "/tmp/session.json"

            [cache]
            enabled = false
            path = "/tmp/cache.db"

            [ui]
            date_format = "%Y-%m-%d"
            time_format = "%I:%M %p"
            default_color = "#3788d8"
        "##;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.api.base_url, "http://10.0.2.2:8081");
        assert_eq!(config.timeout(), std::time::Duration::from_secs(30));
        assert_eq!(config.session.file, PathBuf::from("/tmp/session.json"));
        assert!(!config.cache.enabled);
        assert_eq!(config.ui.time_format, "%I:%M %p");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_time_specifier_is_rejected() {
        let mut config = Config::default();
        config.ui.time_format = "%H:%Q".to_string();
        let content = toml::to_string(&config).unwrap();

        let result = Config::from_toml(&content);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidFormat { key: "ui.time_format", .. })
        ));
    }

    #[test]
    fn config_file_with_bad_date_format_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let mut config = Config::default();
        config.ui.date_format = "%d/%Q/%Y".to_string();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let result = Config::load_or_create_at(&path);

        assert!(matches!(result, Err(ConfigError::InvalidFormat { key: "ui.date_format", .. })));
    }

    #[test]
    fn default_formats_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn load_or_create_writes_defaults_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("collendar").join("config.toml");

        let created = Config::load_or_create_at(&path).unwrap();
        let loaded = Config::load_or_create_at(&path).unwrap();

        assert!(path.exists());
        assert_eq!(created, loaded);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;

        assert_eq!(config.timeout(), std::time::Duration::from_secs(1));
    }
}
