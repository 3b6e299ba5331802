//! Enum wrapper for device dispatch and the device factory.
//!
//! # Enum Dispatch Pattern
//!
//! Native `async fn` in traits (RPITIT) are not object-safe, so a directory
//! of heterogeneous devices cannot hold `Box<dyn CommandDevice>`. [`AnyDevice`]
//! provides concrete dispatch instead: each variant forwards to its device,
//! and the dispatcher only ever sees the [`CommandDevice`] contract.
//!
//! # Examples
//!
//! ```
//! use pinbridge_hardware::devices::AnyDevice;
//! use pinbridge_hardware::mock::MockDevice;
//! use pinbridge_hardware::traits::CommandDevice;
//! use pinbridge_core::DeviceKey;
//!
//! let (device, _handle) = MockDevice::new(DeviceKey::new("front-door").unwrap());
//! let any_device = AnyDevice::Mock(device);
//!
//! assert_eq!(any_device.info().key.as_str(), "front-door");
//! ```

use crate::config::{DeviceConfig, TransportConfig};
use crate::error::{HardwareError, Result};
use crate::mock::MockDevice;
use crate::peripherals::{CardMultiplexer, MagstripeReader, PinTerminal};
use crate::traits::CommandDevice;
use crate::types::DeviceInfo;
use pinbridge_core::{DeviceKind, MagicToken};
use pinbridge_discovery::DiscoveryRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared collaborators handed to every device at construction.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// Discovery cache shared by all discovered devices.
    pub registry: Arc<DiscoveryRegistry>,

    /// Token framing the UDP command protocol.
    pub magic: MagicToken,

    /// Transport timeouts and ports.
    pub transport: TransportConfig,

    /// Directory relative layout paths are resolved against.
    pub layout_dir: PathBuf,
}

impl DeviceContext {
    /// Resolve a configured layout path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pinbridge_hardware::devices::DeviceContext;
    /// # use pinbridge_hardware::config::TransportConfig;
    /// # use pinbridge_discovery::{DiscoveryRegistry, DiscoverySource, MockDiscovery};
    /// # use pinbridge_core::MagicToken;
    /// use std::path::{Path, PathBuf};
    ///
    /// # let (mock, _) = MockDiscovery::new();
    /// let context = DeviceContext {
    /// #   registry: DiscoveryRegistry::shared(DiscoverySource::Mock(mock)),
    /// #   magic: MagicToken::new("AXHW").unwrap(),
    /// #   transport: TransportConfig::default(),
    ///     layout_dir: PathBuf::from("layouts"),
    ///     // ...
    /// };
    ///
    /// assert_eq!(context.layout_path(Path::new("mux.toml")), Path::new("layouts/mux.toml"));
    /// assert_eq!(context.layout_path(Path::new("/etc/mux.toml")), Path::new("/etc/mux.toml"));
    /// ```
    pub fn layout_path(&self, layout: &Path) -> PathBuf {
        if layout.is_absolute() {
            layout.to_path_buf()
        } else {
            self.layout_dir.join(layout)
        }
    }
}

/// Enum wrapper for device dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDevice {
    /// PIN-entry terminal.
    Terminal(PinTerminal),

    /// Card multiplexer.
    Multiplexer(CardMultiplexer),

    /// Magnetic-stripe reader.
    Magstripe(MagstripeReader),

    /// Mock device for development and testing.
    Mock(MockDevice),
}

impl AnyDevice {
    /// Build and initialize the device a configuration entry describes.
    ///
    /// Terminals load their layout, then check their endpoint with a
    /// calibration round trip. Discovered devices load their layout and try
    /// a first lookup; not finding them yet is not a failure.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` if the entry lacks the
    /// addressing its kind needs, or `HardwareError::InitializationFailed`
    /// if the layout cannot be loaded or a terminal is unreachable.
    pub async fn initialize(config: &DeviceConfig, context: &DeviceContext) -> Result<Self> {
        config.validate()?;
        let layout = context.layout_path(&config.layout);

        match config.kind {
            DeviceKind::Terminal => {
                let endpoint = config.endpoint().ok_or_else(|| {
                    HardwareError::configuration(format!("{}: missing endpoint", config.id))
                })?;
                let mut terminal = PinTerminal::new(config.id.clone(), context.transport.timeout());
                terminal.initialize_terminal(&layout).await?;
                terminal.initialize_connection(endpoint).await?;
                Ok(Self::Terminal(terminal))
            }
            DeviceKind::Multiplexer => {
                let mut mux = CardMultiplexer::new(config.id.clone(), required_mac(config)?, context);
                mux.initialize_device(&layout).await?;
                Ok(Self::Multiplexer(mux))
            }
            DeviceKind::Magstripe => {
                let mut reader =
                    MagstripeReader::new(config.id.clone(), required_mac(config)?, context);
                reader.initialize_device(&layout).await?;
                Ok(Self::Magstripe(reader))
            }
        }
    }
}

fn required_mac(config: &DeviceConfig) -> Result<pinbridge_core::HardwareAddress> {
    config.mac.ok_or_else(|| {
        HardwareError::configuration(format!("{}: missing mac address", config.id))
    })
}

impl CommandDevice for AnyDevice {
    fn info(&self) -> DeviceInfo {
        match self {
            Self::Terminal(device) => device.info(),
            Self::Multiplexer(device) => device.info(),
            Self::Magstripe(device) => device.info(),
            Self::Mock(device) => device.info(),
        }
    }

    async fn device_lookup(&mut self) -> bool {
        match self {
            Self::Terminal(device) => device.device_lookup().await,
            Self::Multiplexer(device) => device.device_lookup().await,
            Self::Magstripe(device) => device.device_lookup().await,
            Self::Mock(device) => device.device_lookup().await,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Terminal(device) => device.connect().await,
            Self::Multiplexer(device) => device.connect().await,
            Self::Magstripe(device) => device.connect().await,
            Self::Mock(device) => device.connect().await,
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        match self {
            Self::Terminal(device) => device.send_command(command).await,
            Self::Multiplexer(device) => device.send_command(command).await,
            Self::Magstripe(device) => device.send_command(command).await,
            Self::Mock(device) => device.send_command(command).await,
        }
    }

    async fn close_connection(&mut self) {
        match self {
            Self::Terminal(device) => device.close_connection().await,
            Self::Multiplexer(device) => device.close_connection().await,
            Self::Magstripe(device) => device.close_connection().await,
            Self::Mock(device) => device.close_connection().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Terminal(device) => device.is_connected(),
            Self::Multiplexer(device) => device.is_connected(),
            Self::Magstripe(device) => device.is_connected(),
            Self::Mock(device) => device.is_connected(),
        }
    }
}

impl From<MockDevice> for AnyDevice {
    fn from(device: MockDevice) -> Self {
        Self::Mock(device)
    }
}
