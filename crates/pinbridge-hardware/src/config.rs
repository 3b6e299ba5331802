//! Per-device and transport configuration.
//!
//! These are the entries of the gateway configuration file that describe
//! devices. They deserialize directly from TOML:
//!
//! ```toml
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

use crate::error::{HardwareError, Result};
use pinbridge_core::constants::{DEFAULT_COMMAND_PORT, DEFAULT_TRANSPORT_TIMEOUT_MS};
use pinbridge_core::{DeviceKey, DeviceKind, HardwareAddress};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Logical key clients address the device by.
    pub id: DeviceKey,

    /// Device kind.
    pub kind: DeviceKind,

    /// Layout file, relative to the layout directory unless absolute.
    pub layout: PathBuf,

    /// Terminal IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Ipv4Addr>,

    /// Terminal TCP port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Hardware address of a discovered device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<HardwareAddress>,
}

impl DeviceConfig {
    /// Configuration for a statically addressed terminal.
    pub fn terminal(id: DeviceKey, layout: impl Into<PathBuf>, endpoint: SocketAddrV4) -> Self {
        Self {
            id,
            kind: DeviceKind::Terminal,
            layout: layout.into(),
            ip: Some(*endpoint.ip()),
            port: Some(endpoint.port()),
            mac: None,
        }
    }

    /// Configuration for a device located by hardware address.
    pub fn discovered(
        id: DeviceKey,
        kind: DeviceKind,
        layout: impl Into<PathBuf>,
        mac: HardwareAddress,
    ) -> Self {
        Self {
            id,
            kind,
            layout: layout.into(),
            ip: None,
            port: None,
            mac: Some(mac),
        }
    }

    /// Configured terminal endpoint, if both IP and port are present.
    pub fn endpoint(&self) -> Option<SocketAddrV4> {
        Some(SocketAddrV4::new(self.ip?, self.port?))
    }

    /// Check that the entry carries the addressing its kind needs.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` if a terminal lacks an IP
    /// or port, or a discovered device lacks a hardware address.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_discovered() {
            if self.mac.is_none() {
                return Err(HardwareError::configuration(format!(
                    "{}: {} requires a mac address",
                    self.id, self.kind
                )));
            }
        } else if self.endpoint().is_none() {
            return Err(HardwareError::configuration(format!(
                "{}: terminal requires ip and port",
                self.id
            )));
        }
        Ok(())
    }
}

/// Transport settings shared by every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Bound on connect, send and reply waits, in milliseconds.
    pub timeout_ms: u64,

    /// UDP port discovered devices accept commands on.
    pub command_port: u16,
}

impl TransportConfig {
    /// Timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TRANSPORT_TIMEOUT_MS,
            command_port: DEFAULT_COMMAND_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Devices {
        device: Vec<DeviceConfig>,
    }

    #[test]
    fn test_deserialize_devices() {
        let text = r#"
            [[device]]
            id = "front-door"
            kind = "terminal"
            layout = "front-door.toml"
            ip = "10.0.0.12"
            port = 5000

            [[device]]
            id = "reader-1"
            kind = "magstripe"
            layout = "/etc/pinbridge/reader.toml"
            mac = "00-1B-C5-00-00-02"
        "#;

        let devices: Devices = toml::from_str(text).unwrap();
        assert_eq!(devices.device.len(), 2);

        let terminal = &devices.device[0];
        assert_eq!(terminal.id.as_str(), "front-door");
        assert_eq!(terminal.endpoint(), Some("10.0.0.12:5000".parse().unwrap()));
        assert!(terminal.validate().is_ok());

        let reader = &devices.device[1];
        assert_eq!(reader.kind, DeviceKind::Magstripe);
        assert_eq!(reader.mac.unwrap().to_string(), "00:1b:c5:00:00:02");
        assert!(reader.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_addressing() {
        let mut terminal = DeviceConfig::terminal(
            DeviceKey::new("front-door").unwrap(),
            "front-door.toml",
            "10.0.0.12:5000".parse().unwrap(),
        );
        terminal.port = None;
        assert!(terminal.validate().is_err());

        let mut mux = DeviceConfig::discovered(
            DeviceKey::new("mux-1").unwrap(),
            DeviceKind::Multiplexer,
            "mux.toml",
            HardwareAddress::new([0, 0x1b, 0xc5, 0, 0, 1]),
        );
        mux.mac = None;
        assert!(mux.validate().is_err());
    }

    #[test]
    fn test_transport_defaults() {
        let transport: TransportConfig = toml::from_str("timeout_ms = 250").unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(250));
        assert_eq!(transport.command_port, DEFAULT_COMMAND_PORT);
    }
}
