//! Common types shared across device implementations.

use pinbridge_core::{DeviceKey, DeviceKind};
use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Identifies a device independently of its concrete variant, so callers
/// can log and list devices without matching on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Logical key the device is registered under.
    pub key: DeviceKey,

    /// Device kind.
    pub kind: DeviceKind,

    /// Name of the loaded key layout, if any.
    pub layout: Option<String>,

    /// Current endpoint (e.g. `10.0.0.12:5000`), if known.
    pub endpoint: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(key: DeviceKey, kind: DeviceKind) -> Self {
        Self {
            key,
            kind,
            layout: None,
            endpoint: None,
        }
    }

    /// Set the layout name.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl ToString) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.key, self.kind)?;
        if let Some(endpoint) = &self.endpoint {
            write!(f, " at {}", endpoint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DeviceKey {
        DeviceKey::new(s).unwrap()
    }

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new(key("front-door"), DeviceKind::Terminal)
            .with_layout("Front door keypad")
            .with_endpoint("10.0.0.12:5000");

        assert_eq!(info.layout.as_deref(), Some("Front door keypad"));
        assert_eq!(info.endpoint.as_deref(), Some("10.0.0.12:5000"));
        assert_eq!(info.to_string(), "front-door (Terminal) at 10.0.0.12:5000");
    }

    #[test]
    fn test_device_info_serialization() {
        let info = DeviceInfo::new(key("mux-1"), DeviceKind::Multiplexer);
        let json = serde_json::to_string(&info).unwrap();
        let deserialized: DeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, deserialized);
    }
}
