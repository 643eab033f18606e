//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! transit-sign.toml file. It carries the WiFi credentials, the departures API
//! endpoint and key, the sign's coordinates, page timing, and the optional
//! telemetry link settings.
//!
//! The sign has nothing sensible to fall back to without its API key and
//! location, so unlike a best-effort settings file a missing or invalid
//! configuration is an error the caller must treat as fatal.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::panel::{PANEL_HEIGHT, PANEL_WIDTH};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "transit-sign.toml";

/// Errors raised while loading the configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or is missing required fields
    #[error("invalid config format: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but a value is unusable
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Application configuration loaded from transit-sign.toml
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Network credentials
    pub wifi: WifiConfig,
    /// Departures API endpoint
    pub api: ApiConfig,
    /// Sign location used for the nearby-departures query
    pub geo: GeoConfig,
    /// Page timing and panel geometry
    pub display: DisplayConfig,
    /// Remote log channel, absent when the sign has none
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// WiFi network the sign joins
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

/// Departures API configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL without trailing path, e.g. "https://api.example.com"
    pub url: String,
    /// Sent as the `x-api-key` header
    pub secret: String,
}

/// Geographic position of the sign
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GeoConfig {
    pub lat: f64,
    pub lon: f64,
}

/// Display timing and geometry
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// How long each page of two routes stays on screen
    pub page_interval_ms: u64,
    /// Minimum time between two showings of the operator message
    pub message_interval_ms: u64,
    /// Panel width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Panel height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Telemetry (MQTT over TLS) configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Master switch; the section may be kept while disabled
    pub enabled: bool,
    /// Broker host name
    pub endpoint: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Device identity; also the MQTT client id, which broker policy checks
    pub thing_name: String,
    /// Topic log records are published to
    pub log_topic: String,
    /// Device certificate (PEM file)
    pub cert_pem: PathBuf,
    /// Device private key (PEM file)
    pub private_key: PathBuf,
    /// Broker CA certificate (PEM file)
    pub root_ca: PathBuf,
}

fn default_width() -> u32 {
    PANEL_WIDTH
}

fn default_height() -> u32 {
    PANEL_HEIGHT
}

fn default_mqtt_port() -> u16 {
    8883
}

impl DisplayConfig {
    pub fn page_interval(&self) -> Duration {
        Duration::from_millis(self.page_interval_ms)
    }

    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }
}

impl Config {
    /// Load configuration from the specified path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a configuration document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// True when a telemetry section exists and is switched on
    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.as_ref().is_some_and(|t| t.enabled)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.url is empty".into()));
        }
        if self.display.page_interval_ms == 0 || self.display.message_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "display intervals must be non-zero".into(),
            ));
        }
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid("display size must be non-zero".into()));
        }
        if let Some(telemetry) = self.telemetry.as_ref().filter(|t| t.enabled) {
            if telemetry.thing_name.is_empty() || telemetry.log_topic.is_empty() {
                return Err(ConfigError::Invalid(
                    "telemetry.thing_name and telemetry.log_topic are required".into(),
                ));
            }
        }
        Ok(())
    }
}
