//! Device capability trait.
//!
//! Every controllable device implements [`CommandDevice`]: a short-lived
//! session is opened with `connect`, commands are sent one at a time, and the
//! session is closed again. The dispatcher is written once against this
//! trait and never inspects which concrete device it holds.
//!
//! The trait uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT). It is therefore not object-safe; heterogeneous collections go
//! through the [`AnyDevice`](crate::devices::AnyDevice) enum instead of
//! `Box<dyn CommandDevice>`.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::DeviceInfo;

/// Device that executes command tokens over a connection-oriented session.
///
/// # Session Lifecycle
///
/// 1. `device_lookup` (discovered devices only) resolves the endpoint
/// 2. `connect` opens the transport
/// 3. `send_command` runs once per command, in order
/// 4. `close_connection` releases the transport
///
/// Callers serialize access per device, so implementations never see two
/// overlapping sessions.
///
/// # Examples
///
/// ```no_run
/// use pinbridge_hardware::traits::CommandDevice;
/// use pinbridge_hardware::Result;
///
/// async fn run_batch<D: CommandDevice>(device: &mut D, commands: &[&str]) -> Result<()> {
///     device.connect().await?;
///
///     let mut result = Ok(());
///     for command in commands {
///         result = device.send_command(command).await;
///         if result.is_err() {
///             break;
///         }
///     }
///
///     device.close_connection().await;
///     result
/// }
/// ```
pub trait CommandDevice: Send + Sync {
    /// Identity of the device.
    fn info(&self) -> DeviceInfo;

    /// Resolve the device endpoint.
    ///
    /// Discovered devices ask the discovery registry, which may trigger a
    /// discovery round. Statically addressed devices report whether an
    /// endpoint is configured.
    async fn device_lookup(&mut self) -> bool;

    /// Open a transport session.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be resolved or the transport
    /// cannot be opened within the configured timeout.
    async fn connect(&mut self) -> Result<()>;

    /// Send one command token and wait for the device acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::UnknownCommand` if the token is not part of the
    /// device layout (nothing is sent), `HardwareError::Rejected` if the
    /// device answered negatively, or a transport error.
    async fn send_command(&mut self, command: &str) -> Result<()>;

    /// Close the session if one is open.
    ///
    /// Idempotent, and safe to call when `connect` failed or never ran.
    async fn close_connection(&mut self);

    /// Whether a session is currently open.
    fn is_connected(&self) -> bool;
}
