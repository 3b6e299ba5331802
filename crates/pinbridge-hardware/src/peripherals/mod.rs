//! Concrete devices.
//!
//! | Device | Addressing | Transport |
//! |--------|------------|-----------|
//! | [`PinTerminal`] | configured IP and port | [`LineTransport`](crate::transport::LineTransport) |
//! | [`CardMultiplexer`] | hardware address, via discovery | [`DatagramChannel`](crate::transport::DatagramChannel) |
//! | [`MagstripeReader`] | hardware address, via discovery | [`DatagramChannel`](crate::transport::DatagramChannel) |

/// Declare a device kind backed by a [`NetworkedPeripheral`].
///
/// Discovered devices differ only in the kind they report, so each one is a
/// newtype forwarding to the shared peripheral.
macro_rules! discovered_device {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            inner: $crate::peripherals::NetworkedPeripheral,
        }

        impl $name {
            /// Create a device located by `address`.
            pub fn new(
                key: pinbridge_core::DeviceKey,
                address: pinbridge_core::HardwareAddress,
                context: &$crate::devices::DeviceContext,
            ) -> Self {
                Self {
                    inner: $crate::peripherals::NetworkedPeripheral::new(
                        key, $kind, address, context,
                    ),
                }
            }

            /// Use an already loaded layout.
            pub fn with_layout(mut self, layout: $crate::layout::KeyLayout) -> Self {
                self.inner = self.inner.with_layout(layout);
                self
            }

            /// Load the layout and try a first lookup.
            ///
            /// # Errors
            ///
            /// Returns `HardwareError::InitializationFailed` if the layout
            /// cannot be loaded.
            pub async fn initialize_device(
                &mut self,
                layout_path: &std::path::Path,
            ) -> $crate::error::Result<()> {
                self.inner.initialize_device(layout_path).await
            }
        }

        impl $crate::traits::CommandDevice for $name {
            fn info(&self) -> $crate::types::DeviceInfo {
                self.inner.info()
            }

            async fn device_lookup(&mut self) -> bool {
                self.inner.device_lookup().await
            }

            async fn connect(&mut self) -> $crate::error::Result<()> {
                self.inner.connect().await
            }

            async fn send_command(&mut self, command: &str) -> $crate::error::Result<()> {
                self.inner.send_command(command).await
            }

            async fn close_connection(&mut self) {
                self.inner.close_connection().await
            }

            fn is_connected(&self) -> bool {
                self.inner.is_connected()
            }
        }
    };
}

pub mod magstripe;
pub mod multiplexer;
pub mod networked;
pub mod terminal;

pub use magstripe::MagstripeReader;
pub use multiplexer::CardMultiplexer;
pub use networked::NetworkedPeripheral;
pub use terminal::PinTerminal;
