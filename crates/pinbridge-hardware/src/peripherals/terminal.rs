//! PIN-entry terminal.

use crate::error::{HardwareError, Result};
use crate::layout::KeyLayout;
use crate::traits::CommandDevice;
use crate::transport::LineTransport;
use crate::types::DeviceInfo;
use pinbridge_core::constants::{CALIBRATION_COMMAND, TERMINAL_ACK};
use pinbridge_core::{DeviceKey, DeviceKind};
use std::net::{SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// PIN-entry terminal reached over TCP at a configured address.
///
/// Startup runs in two steps: [`initialize_terminal`](Self::initialize_terminal)
/// loads the key layout, then
/// [`initialize_connection`](Self::initialize_connection) records the
/// endpoint and checks it with a calibration round trip.
///
/// # Examples
///
/// ```no_run
/// use pinbridge_hardware::peripherals::PinTerminal;
/// use pinbridge_hardware::traits::CommandDevice;
/// use pinbridge_core::DeviceKey;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> pinbridge_hardware::Result<()> {
/// let mut terminal = PinTerminal::new(DeviceKey::new("front-door")?, Duration::from_secs(3));
/// terminal.initialize_terminal(Path::new("layouts/front-door.toml")).await?;
/// terminal.initialize_connection("10.0.0.12:5000".parse().unwrap()).await?;
///
/// terminal.connect().await?;
/// terminal.send_command("OPEN").await?;
/// terminal.close_connection().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PinTerminal {
    key: DeviceKey,
    layout: Option<KeyLayout>,
    endpoint: Option<SocketAddrV4>,
    timeout: Duration,
    transport: Option<LineTransport>,
}

impl PinTerminal {
    /// Create an uninitialized terminal.
    pub fn new(key: DeviceKey, timeout: Duration) -> Self {
        Self {
            key,
            layout: None,
            endpoint: None,
            timeout,
            transport: None,
        }
    }

    /// Use an already loaded layout.
    pub fn with_layout(mut self, layout: KeyLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Load the key layout.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the layout cannot be
    /// loaded.
    pub async fn initialize_terminal(&mut self, layout_path: &Path) -> Result<()> {
        let layout = KeyLayout::load(layout_path).await?;
        debug!(key = %self.key, layout = %layout.name, "Terminal layout loaded");
        self.layout = Some(layout);
        Ok(())
    }

    /// Record the endpoint and check that the terminal answers.
    ///
    /// Connects, sends the calibration command, and closes again. A rejected
    /// calibration is only logged; an unreachable terminal fails.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the terminal cannot
    /// be reached.
    pub async fn initialize_connection(&mut self, endpoint: SocketAddrV4) -> Result<()> {
        self.endpoint = Some(endpoint);

        self.connect().await.map_err(|e| {
            HardwareError::initialization_failed(format!(
                "terminal {} unreachable at {}: {}",
                self.key, endpoint, e
            ))
        })?;

        if let Err(e) = self.send_command(CALIBRATION_COMMAND).await {
            warn!(key = %self.key, "Terminal calibration failed: {}", e);
        }

        self.close_connection().await;
        info!(key = %self.key, %endpoint, "Terminal ready");
        Ok(())
    }

    /// Configured endpoint, if set.
    pub fn endpoint(&self) -> Option<SocketAddrV4> {
        self.endpoint
    }
}

impl CommandDevice for PinTerminal {
    fn info(&self) -> DeviceInfo {
        let mut info = DeviceInfo::new(self.key.clone(), DeviceKind::Terminal);
        if let Some(layout) = &self.layout {
            info = info.with_layout(&layout.name);
        }
        if let Some(endpoint) = self.endpoint {
            info = info.with_endpoint(endpoint);
        }
        info
    }

    async fn device_lookup(&mut self) -> bool {
        self.endpoint.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        let endpoint = self.endpoint.ok_or_else(|| {
            HardwareError::configuration(format!("terminal {} has no endpoint", self.key))
        })?;

        self.close_connection().await;

        let mut transport = LineTransport::new(SocketAddr::V4(endpoint), self.timeout);
        transport.connect().await?;
        self.transport = Some(transport);
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| HardwareError::configuration(format!("terminal {} has no layout", self.key)))?;
        let code = layout.code_for(command)?;

        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(self.key.as_str()))?;

        let reply = transport.request(code).await?;
        if reply.trim().eq_ignore_ascii_case(TERMINAL_ACK) {
            Ok(())
        } else {
            Err(HardwareError::rejected(command, reply.trim()))
        }
    }

    async fn close_connection(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(LineTransport::is_connected)
    }
}
