use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use liftsync_core::SyncSettings;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local document store
    pub data_dir: ConfigValue<PathBuf>,
    /// Signed-in user; none means plans are kept locally only
    pub user_id: ConfigValue<Option<String>>,
    pub email: ConfigValue<Option<String>>,
    pub fallback_delay_ms: ConfigValue<u64>,
    pub settle_delay_ms: ConfigValue<u64>,
    /// Row height used when translating drag distance into positions
    pub item_height: ConfigValue<f32>,
    pub set_write_debounce_ms: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    user_id: Option<String>,
    email: Option<String>,
    fallback_delay_ms: Option<u64>,
    settle_delay_ms: Option<u64>,
    item_height: Option<f32>,
    set_write_debounce_ms: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = SyncSettings::default();

        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut user_id = ConfigValue::new(None, ConfigSource::Default);
        let mut email = ConfigValue::new(None, ConfigSource::Default);
        let mut fallback_delay_ms = ConfigValue::new(
            defaults.fallback_delay.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut settle_delay_ms = ConfigValue::new(
            defaults.settle_delay.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut item_height = ConfigValue::new(80.0, ConfigSource::Default);
        let mut set_write_debounce_ms = ConfigValue::new(
            defaults.set_write_debounce.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(id) = file_config.user_id {
                user_id = ConfigValue::new(Some(id), ConfigSource::File);
            }
            if let Some(address) = file_config.email {
                email = ConfigValue::new(Some(address), ConfigSource::File);
            }
            if let Some(ms) = file_config.fallback_delay_ms {
                fallback_delay_ms = ConfigValue::new(ms, ConfigSource::File);
            }
            if let Some(ms) = file_config.settle_delay_ms {
                settle_delay_ms = ConfigValue::new(ms, ConfigSource::File);
            }
            if let Some(height) = file_config.item_height {
                if !height.is_finite() || height <= 0.0 {
                    return Err(ConfigError::InvalidValue(
                        path.clone(),
                        "item_height",
                        format!("must be a positive number, got {}", height),
                    ));
                }
                item_height = ConfigValue::new(height, ConfigSource::File);
            }
            if let Some(ms) = file_config.set_write_debounce_ms {
                set_write_debounce_ms = ConfigValue::new(ms, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("LIFTSYNC_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(id) = std::env::var("LIFTSYNC_USER_ID") {
            let id = Some(id).filter(|s| !s.trim().is_empty());
            user_id = ConfigValue::new(id, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            user_id,
            email,
            fallback_delay_ms,
            settle_delay_ms,
            item_height,
            set_write_debounce_ms,
            config_file,
        })
    }

    /// Coordinator timings from the configured millisecond values.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            fallback_delay: Duration::from_millis(self.fallback_delay_ms.value),
            settle_delay: Duration::from_millis(self.settle_delay_ms.value),
            set_write_debounce: Duration::from_millis(self.set_write_debounce_ms.value),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/liftsync/
    /// - macOS: ~/Library/Application Support/liftsync/
    /// - Windows: %APPDATA%/liftsync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/liftsync/
    /// - macOS: ~/Library/Application Support/liftsync/
    /// - Windows: %APPDATA%/liftsync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(PathBuf, &'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(path, key, reason) => {
                write!(f, "Invalid {} in config file '{}': {}", key, path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
