//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ScoringWeights;

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

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Region shard for match-history lookups.
    #[serde(default = "default_region")]
    pub region: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Matches fetched per identity during recompute.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Minimum delay between successive identity fetches (rate limiting).
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.henrikdev.xyz".to_string()
}

fn default_region() -> String {
    "ap".to_string()
}

fn default_api_key_env() -> String {
    "VALORANT_API_KEY".to_string()
}

fn default_window_size() -> usize {
    5
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            region: default_region(),
            api_key_env: default_api_key_env(),
            window_size: default_window_size(),
            request_delay_ms: default_request_delay_ms(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Wall-clock schedule for the periodic passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minute of every hour the recompute pass triggers at.
    #[serde(default)]
    pub recompute_minute: u32,

    /// Hour of day the distribution pass triggers at.
    #[serde(default = "default_distribute_hour")]
    pub distribute_hour: u32,

    /// Minute within that hour.
    #[serde(default = "default_distribute_minute")]
    pub distribute_minute: u32,
}

fn default_distribute_hour() -> u32 {
    23
}

fn default_distribute_minute() -> u32 {
    59
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            recompute_minute: 0,
            distribute_hour: default_distribute_hour(),
            distribute_minute: default_distribute_minute(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ranking cutoff per tenant view.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub scoring: ScoringWeights,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_n() -> usize {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            top_n: default_top_n(),
            upstream: UpstreamConfig::default(),
            scoring: ScoringWeights::default(),
            schedule: ScheduleConfig::default(),
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

    /// Load from file when it exists, else defaults.
    pub fn load_or_default(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "upstream.window_size must be greater than 0".to_string(),
            ));
        }

        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "upstream.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "top_n must be greater than 0".to_string(),
            ));
        }

        if self.schedule.recompute_minute > 59
            || self.schedule.distribute_minute > 59
            || self.schedule.distribute_hour > 23
        {
            return Err(ConfigError::ValidationError(
                "schedule fields must be valid wall-clock values".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.upstream.region, "ap");
        assert_eq!(config.upstream.window_size, 5);
        assert_eq!(config.top_n, 15);
        assert_eq!(config.schedule.recompute_minute, 0);
        assert_eq!(config.schedule.distribute_hour, 23);
        assert_eq!(config.schedule.distribute_minute, 59);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_window() {
        let mut config = AppConfig::default();
        config.upstream.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_schedule() {
        let mut config = AppConfig::default();
        config.schedule.distribute_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.scoring.win, parsed.scoring.win);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            top_n = 10

            [scoring]
            kill = 2.0
            assist = 0.5
            win = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(parsed.top_n, 10);
        assert_eq!(parsed.scoring.kill, 2.0);
        assert_eq!(parsed.upstream.window_size, 5);
    }
}
