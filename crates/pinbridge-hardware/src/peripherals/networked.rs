//! Shared behaviour of devices located by hardware address.
//!
//! Multiplexers and magstripe readers get their IP from DHCP, so the gateway
//! only knows their hardware address. Every `connect` resolves it through the
//! shared [`DiscoveryRegistry`]: a cached binding is used directly, a miss
//! runs one discovery round.

use crate::devices::DeviceContext;
use crate::error::{HardwareError, Result};
use crate::layout::KeyLayout;
use crate::transport::DatagramChannel;
use crate::types::DeviceInfo;
use pinbridge_core::constants::STATUS_OK;
use pinbridge_core::{DeviceKey, DeviceKind, HardwareAddress, MagicToken};
use pinbridge_discovery::{AddressBinding, DiscoveryRegistry};
use std::net::SocketAddrV4;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Discovered device speaking the UDP command protocol.
#[derive(Debug)]
pub struct NetworkedPeripheral {
    key: DeviceKey,
    kind: DeviceKind,
    address: HardwareAddress,
    registry: Arc<DiscoveryRegistry>,
    magic: MagicToken,
    command_port: u16,
    timeout: Duration,
    layout: Option<KeyLayout>,
    binding: Option<AddressBinding>,
    channel: Option<DatagramChannel>,
}

impl NetworkedPeripheral {
    /// Create a peripheral sharing the context's registry.
    pub fn new(
        key: DeviceKey,
        kind: DeviceKind,
        address: HardwareAddress,
        context: &DeviceContext,
    ) -> Self {
        Self {
            key,
            kind,
            address,
            registry: Arc::clone(&context.registry),
            magic: context.magic.clone(),
            command_port: context.transport.command_port,
            timeout: context.transport.timeout(),
            layout: None,
            binding: None,
            channel: None,
        }
    }

    /// Use an already loaded layout.
    pub fn with_layout(mut self, layout: KeyLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Load the layout and try a first lookup.
    ///
    /// A device that cannot be found yet stays usable: it is resolved again
    /// on every connect.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the layout cannot be
    /// loaded.
    pub async fn initialize_device(&mut self, layout_path: &Path) -> Result<()> {
        self.layout = Some(KeyLayout::load(layout_path).await?);

        if self.device_lookup().await {
            info!(key = %self.key, address = %self.address, "{} ready", self.kind);
        } else {
            warn!(
                key = %self.key,
                address = %self.address,
                "{} not found yet, will retry on connect",
                self.kind
            );
        }
        Ok(())
    }

    /// Hardware address the device is located by.
    pub fn address(&self) -> HardwareAddress {
        self.address
    }

    /// Latest binding obtained by this device.
    pub fn binding(&self) -> Option<&AddressBinding> {
        self.binding.as_ref()
    }

    pub(crate) fn info(&self) -> DeviceInfo {
        let mut info = DeviceInfo::new(self.key.clone(), self.kind);
        if let Some(layout) = &self.layout {
            info = info.with_layout(&layout.name);
        }
        if let Some(binding) = &self.binding {
            info = info.with_endpoint(SocketAddrV4::new(binding.ip, self.command_port));
        }
        info
    }

    pub(crate) async fn device_lookup(&mut self) -> bool {
        match self.registry.resolve(self.address).await {
            Ok(binding) => {
                debug!(key = %self.key, "Resolved {}", binding);
                self.binding = Some(binding);
                true
            }
            Err(e) => {
                debug!(key = %self.key, "Lookup failed: {}", e);
                false
            }
        }
    }

    pub(crate) async fn connect(&mut self) -> Result<()> {
        self.close_connection().await;

        if !self.device_lookup().await {
            return Err(HardwareError::not_resolved(self.address));
        }
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| HardwareError::not_resolved(self.address))?;

        let channel = DatagramChannel::open(
            binding.interface.local_ip,
            SocketAddrV4::new(binding.ip, self.command_port),
            self.magic.clone(),
            self.address,
            self.timeout,
        )
        .await?;
        self.channel = Some(channel);
        Ok(())
    }

    pub(crate) async fn send_command(&mut self, command: &str) -> Result<()> {
        let layout = self.layout.as_ref().ok_or_else(|| {
            HardwareError::configuration(format!("{} has no layout", self.key))
        })?;
        let code = layout.code_for(command)?;

        let channel = self
            .channel
            .as_ref()
            .ok_or_else(|| HardwareError::disconnected(self.key.as_str()))?;

        match channel.request(code).await? {
            STATUS_OK => Ok(()),
            status => Err(HardwareError::rejected(
                command,
                format!("status 0x{:02x}", status),
            )),
        }
    }

    pub(crate) async fn close_connection(&mut self) {
        if self.channel.take().is_some() {
            debug!(key = %self.key, "Command channel closed");
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.channel.is_some()
    }
}
