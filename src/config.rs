//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Explicit device path; empty means autodetect over common paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Write the one-shot software reset command after opening the port
    #[serde(default)]
    pub reset_on_connect: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            reset_on_connect: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // Empty serial.port means autodetect, so only the baud rate needs
        // a sanity bound
        if self.serial.baud_rate == 0 || self.serial.baud_rate > 4_000_000 {
            return Err(crate::error::ImuBridgeError::Config(
                toml::de::Error::custom("baud_rate must be between 1 and 4000000"),
            ));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(crate::error::ImuBridgeError::Config(
                toml::de::Error::custom("telemetry log_dir cannot be empty when enabled"),
            ));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(crate::error::ImuBridgeError::Config(
                toml::de::Error::custom("max_records_per_file must be at least 1"),
            ));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(crate::error::ImuBridgeError::Config(
                toml::de::Error::custom("max_files_to_keep must be at least 1"),
            ));
        }

        Ok(())
    }
}
