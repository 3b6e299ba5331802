//! Mock command device.
//!
//! The device accepts every command unless told otherwise through its
//! [`MockDeviceHandle`], and records what it saw: sent commands in order,
//! connects, closes, and how many sessions were open at the same time.

use crate::{HardwareError, Result, traits::CommandDevice, types::DeviceInfo};
use pinbridge_core::{DeviceKey, DeviceKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock device for testing and development.
///
/// # Examples
///
/// ```
/// use pinbridge_hardware::mock::MockDevice;
/// use pinbridge_hardware::traits::CommandDevice;
/// use pinbridge_core::DeviceKey;
///
/// #[tokio::main]
/// async fn main() -> pinbridge_hardware::Result<()> {
///     let (mut device, handle) = MockDevice::new(DeviceKey::new("front-door")?);
///     handle.reject("OPEN");
///
///     device.connect().await?;
///     device.send_command("HOME").await?;
///     assert!(device.send_command("OPEN").await.is_err());
///     device.close_connection().await;
///
///     assert_eq!(handle.sent(), vec!["HOME".to_string()]);
///     assert_eq!(handle.open_sessions(), 0);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockDevice {
    key: DeviceKey,
    kind: DeviceKind,
    connected: bool,
    state: Arc<Mutex<MockDeviceState>>,
}

#[derive(Debug)]
struct MockDeviceState {
    reachable: bool,
    fail_connect: bool,
    rejected: HashSet<String>,
    delay: Duration,
    sent: Vec<String>,
    connects: u64,
    closes: u64,
    open: usize,
    max_open: usize,
}

impl Default for MockDeviceState {
    fn default() -> Self {
        Self {
            reachable: true,
            fail_connect: false,
            rejected: HashSet::new(),
            delay: Duration::ZERO,
            sent: Vec::new(),
            connects: 0,
            closes: 0,
            open: 0,
            max_open: 0,
        }
    }
}

impl MockDevice {
    /// Create a mock terminal.
    ///
    /// Returns a tuple of (MockDevice, MockDeviceHandle) where the handle
    /// scripts and observes the device.
    pub fn new(key: DeviceKey) -> (Self, MockDeviceHandle) {
        Self::with_kind(key, DeviceKind::Terminal)
    }

    /// Create a mock device of the given kind.
    pub fn with_kind(key: DeviceKey, kind: DeviceKind) -> (Self, MockDeviceHandle) {
        let state = Arc::new(Mutex::new(MockDeviceState::default()));

        let device = Self {
            key,
            kind,
            connected: false,
            state: Arc::clone(&state),
        };

        (device, MockDeviceHandle { state })
    }

    fn state(&self) -> MutexGuard<'_, MockDeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandDevice for MockDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.key.clone(), self.kind).with_layout("Mock layout")
    }

    async fn device_lookup(&mut self) -> bool {
        self.state().reachable
    }

    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            self.close_connection().await;
        }

        let mut state = self.state();
        if state.fail_connect || !state.reachable {
            return Err(HardwareError::communication(format!(
                "{} refused connection",
                self.key
            )));
        }

        state.connects += 1;
        state.open += 1;
        state.max_open = state.max_open.max(state.open);
        drop(state);

        self.connected = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        if !self.connected {
            return Err(HardwareError::disconnected(self.key.as_str()));
        }

        let delay = self.state().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.rejected.contains(command) {
            return Err(HardwareError::rejected(command, "ERR"));
        }
        state.sent.push(command.to_string());
        Ok(())
    }

    async fn close_connection(&mut self) {
        if self.connected {
            self.connected = false;
            let mut state = self.state();
            state.open -= 1;
            state.closes += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Handle for scripting and observing a mock device.
///
/// Cloneable; every clone talks to the same device.
#[derive(Debug, Clone)]
pub struct MockDeviceHandle {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDeviceHandle {
    fn state(&self) -> MutexGuard<'_, MockDeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the device answer `command` negatively.
    pub fn reject(&self, command: impl Into<String>) {
        self.state().rejected.insert(command.into());
    }

    /// Make every following connect attempt fail or succeed.
    pub fn set_fail_connect(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    /// Make the device unreachable: lookups and connects fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Time each command takes before the device answers.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = delay;
    }

    /// Commands the device acknowledged, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    /// Number of successful connects.
    pub fn connects(&self) -> u64 {
        self.state().connects
    }

    /// Number of sessions closed.
    pub fn closes(&self) -> u64 {
        self.state().closes
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.state().open
    }

    /// Largest number of sessions ever open at once.
    pub fn max_open_sessions(&self) -> usize {
        self.state().max_open
    }
}
