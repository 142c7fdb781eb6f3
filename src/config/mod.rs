//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Slippi ranked service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippiConfig {
    /// GraphQL gateway endpoint
    #[serde(default = "default_slippi_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_slippi_url() -> String {
    "https://gql-gateway-dot-slippi.uc.r.appspot.com/graphql".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for SlippiConfig {
    fn default() -> Self {
        Self {
            base_url: default_slippi_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Discord REST configuration.
///
/// The bot token is read from the environment variable named by `token_env`,
/// never from the config file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Guild whose channels are searched when resolving a channel by name
    #[serde(default)]
    pub guild_id: Option<u64>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_token_env() -> String {
    "DISCORD_BOT_TOKEN".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            guild_id: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the persisted snapshot file
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Scheduler tick interval in minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u64,

    #[serde(default)]
    pub slippi: SlippiConfig,

    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("./data.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_refresh_interval() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            log_level: default_log_level(),
            refresh_interval_minutes: default_refresh_interval(),
            slippi: SlippiConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "Refresh interval must be greater than 0".to_string(),
            ));
        }

        if self.slippi.timeout_seconds == 0 || self.discord.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
