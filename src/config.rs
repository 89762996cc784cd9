//! Configuration management for m4l.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name used for config directory.
const APP_NAME: &str = "m4l";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote service settings.
    pub source: SourceConfig,

    /// Download behavior and local layout.
    pub download: DownloadConfig,
}

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Host serving the chapter viewer pages.
    pub host: String,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub request_timeout_sec: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "manga4life.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_sec: 30,
        }
    }
}

/// Download configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum page fetches in flight for a whole batch.
    pub max_connections: usize,

    /// Root directory for downloaded titles.
    pub output_directory: PathBuf,

    /// Plain-text ledger of completed titles.
    pub history_file: PathBuf,

    /// Count chapters concurrently instead of one after another.
    pub count_concurrently: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            output_directory: PathBuf::from("MANGA"),
            history_file: PathBuf::from("download_history.txt"),
            count_concurrently: false,
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "source.host".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.source.request_timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                key: "source.request_timeout_sec".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.download.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "download.max_connections".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.host, "manga4life.com");
        assert_eq!(config.download.max_connections, 10);
        assert_eq!(config.download.output_directory, PathBuf::from("MANGA"));
        assert_eq!(
            config.download.history_file,
            PathBuf::from("download_history.txt")
        );
        assert!(!config.download.count_concurrently);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.download.max_connections = 4;
        let file = NamedTempFile::new().unwrap();

        config.save_to(file.path()).unwrap();

        let loaded = Config::load_from(file.path()).unwrap();
        assert_eq!(loaded.download.max_connections, 4);
        assert_eq!(loaded.source.host, config.source.host);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.download.max_connections, 10);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[download]\nmax_connections = 3\n").unwrap();
        assert_eq!(config.download.max_connections, 3);
        assert_eq!(config.download.output_directory, PathBuf::from("MANGA"));
        assert_eq!(config.source.request_timeout_sec, 30);
    }

    #[test]
    fn test_invalid_toml() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[download\n").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.download.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.host = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.request_timeout_sec = 0;
        assert!(config.validate().is_err());
    }
}
