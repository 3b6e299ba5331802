//! Gateway configuration file.
//!
//! ```toml
//! [discovery]
//! magic = "AXHW"
//! port = 30303
//! window_ms = 1000
//!
//! [transport]
//! timeout_ms = 3000
//! command_port = 30304
//!
//! [[device]]
//! id = "front-door"
//! kind = "terminal"
//! layout = "front-door.toml"
//! ip = "10.0.0.12"
//! port = 5000
//!
//! [[device]]
//! id = "mux-1"
//! kind = "multiplexer"
//! layout = "mux.toml"
//! mac = "00:1b:c5:00:00:01"
//! ```
//!
//! Every section is optional; missing fields take their defaults. Devices
//! keep the order they appear in.

use pinbridge_core::MagicToken;
use pinbridge_core::constants::{DEFAULT_DISCOVERY_PORT, DEFAULT_DISCOVERY_WINDOW_MS, DEFAULT_MAGIC};
use pinbridge_discovery::UdpDiscoveryConfig;
use pinbridge_hardware::{DeviceConfig, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
}

/// Discovery probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Shared token carried by probes and replies.
    #[serde(default = "default_magic")]
    pub magic: String,

    /// UDP port devices listen on for probes.
    #[serde(default = "default_discovery_port")]
    pub port: u16,

    /// Reply collection window in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            magic: default_magic(),
            port: default_discovery_port(),
            window_ms: default_window_ms(),
        }
    }
}

impl DiscoverySection {
    /// Discovery client settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the magic token is not usable.
    pub fn client_config(&self) -> Result<UdpDiscoveryConfig, ConfigError> {
        let magic = MagicToken::new(&self.magic).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(UdpDiscoveryConfig {
            magic,
            port: self.port,
            window: Duration::from_millis(self.window_ms),
        })
    }
}

fn default_magic() -> String {
    DEFAULT_MAGIC.to_string()
}

fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}

fn default_window_ms() -> u64 {
    DEFAULT_DISCOVERY_WINDOW_MS
}

impl AppConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// carries an unusable value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Reject settings no device could work with.
    ///
    /// Per-device problems are left to device initialization, which skips
    /// the affected device instead of failing startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discovery.client_config()?;
        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.timeout_ms must be positive".to_string(),
            ));
        }
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid("no device configured".to_string()));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
