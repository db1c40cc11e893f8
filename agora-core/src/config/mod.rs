//! Configuration management for Agora
//!
//! Engine-wide settings loaded from TOML with environment overrides. These are
//! ambient knobs (logging, local validation limits, snapshot storage); the
//! per-community device configuration lives in
//! [`crate::core_community::CommunityConfig`].

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

mod error;

pub use error::ConfigError;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Limits applied to local chat mutations
    pub limits: LimitsConfig,

    /// Snapshot storage configuration
    pub storage: StorageConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Limits enforced on chats created or edited by this device.
///
/// Remote descriptions are not checked against these; a replica must accept
/// whatever the control node publishes as long as it is structurally valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum chat display name length, in characters
    pub max_chat_name_length: usize,

    /// Maximum chat description length, in characters
    pub max_chat_description_length: usize,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite snapshot database
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_chat_name_length: 24,
            max_chat_description_length: 140,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/communities.db"),
            pool_size: 4,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables on top of the defaults
    ///
    /// Recognised variables: `AGORA_LOG_LEVEL`, `AGORA_LOG_JSON`,
    /// `AGORA_MAX_CHAT_NAME_LEN`, `AGORA_MAX_CHAT_DESCRIPTION_LEN`,
    /// `AGORA_DB_PATH`, `AGORA_DB_POOL_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document. Missing sections take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = env::var("AGORA_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Ok(json) = env::var("AGORA_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }
        if let Ok(len) = env::var("AGORA_MAX_CHAT_NAME_LEN") {
            self.limits.max_chat_name_length = len.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid chat name length: {}", e))
            })?;
        }
        if let Ok(len) = env::var("AGORA_MAX_CHAT_DESCRIPTION_LEN") {
            self.limits.max_chat_description_length = len.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid chat description length: {}", e))
            })?;
        }
        if let Ok(path) = env::var("AGORA_DB_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(size) = env::var("AGORA_DB_POOL_SIZE") {
            self.storage.pool_size = size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid pool size: {}", e)))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.limits.max_chat_name_length == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_chat_name_length must be greater than 0".to_string(),
            ));
        }

        if self.storage.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
