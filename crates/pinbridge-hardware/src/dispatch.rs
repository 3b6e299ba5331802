//! Command dispatcher.
//!
//! Runs one device batch per call:
//!
//! 1. Look the key up (no lock taken for unknown keys)
//! 2. Acquire the device lock
//! 3. Connect
//! 4. Send each command in order, stopping at the first failure
//! 5. Close the connection and release the lock, whatever happened
//!
//! Step 5 also holds when the future running the batch is dropped midway:
//! the device session closes the connection in the background before the
//! lock is handed on.
//!
//! Batches for the same key are therefore fully serialized, while batches
//! for different keys run in parallel: there is no lock shared between
//! devices.

use crate::directory::DeviceDirectory;
use crate::error::HardwareError;
use crate::traits::CommandDevice;
use crate::usage::UsageRecorder;
use pinbridge_core::DeviceKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Inbound command request.
///
/// # Examples
///
/// ```
/// use pinbridge_hardware::dispatch::CommandRequest;
///
/// let request: CommandRequest =
///     serde_json::from_str(r#"{"id": "front-door", "commands": ["HOME", "OPEN"]}"#).unwrap();
/// assert_eq!(request.commands.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Logical device key.
    pub id: String,

    /// Command tokens, executed in order.
    pub commands: Vec<String>,
}

impl CommandRequest {
    /// Create a request.
    pub fn new<I, S>(id: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

/// Request-time dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No device is registered under the key.
    #[error("Device not found: {key}")]
    DestinationNotFound { key: String },

    /// The device could not be reached.
    #[error("Device {key} unreachable: {source}")]
    Connection {
        key: String,
        #[source]
        source: HardwareError,
    },

    /// A command of the batch failed; later commands were not attempted.
    #[error("Command {command} failed on {key}: {source}")]
    Input {
        key: String,
        command: String,
        #[source]
        source: HardwareError,
    },
}

impl DispatchError {
    /// Key the failed request targeted.
    pub fn key(&self) -> &str {
        match self {
            Self::DestinationNotFound { key }
            | Self::Connection { key, .. }
            | Self::Input { key, .. } => key,
        }
    }

    /// Command that failed, for input failures.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Input { command, .. } => Some(command),
            _ => None,
        }
    }
}

/// Executes command batches against the device directory.
///
/// Cheap to clone; clones share the directory and the usage recorder.
///
/// # Examples
///
/// ```
/// use pinbridge_hardware::directory::DeviceDirectory;
/// use pinbridge_hardware::dispatch::Dispatcher;
/// use pinbridge_hardware::mock::MockDevice;
/// use pinbridge_hardware::usage::UsageStatistics;
/// use pinbridge_core::DeviceKey;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let (device, handle) = MockDevice::new(DeviceKey::new("front-door").unwrap());
///     let directory = DeviceDirectory::from_devices(vec![device.into()]).unwrap();
///     let stats = Arc::new(UsageStatistics::new());
///     let dispatcher = Dispatcher::new(Arc::new(directory), stats.clone());
///
///     dispatcher.execute("front-door", &["HOME", "OPEN"]).await.unwrap();
///
///     assert_eq!(handle.sent(), vec!["HOME", "OPEN"]);
///     assert_eq!(stats.count("front-door", "OPEN"), 1);
///     assert!(dispatcher.execute("back-door", &["OPEN"]).await.is_err());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    directory: Arc<DeviceDirectory>,
    usage: Arc<dyn UsageRecorder>,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(directory: Arc<DeviceDirectory>, usage: Arc<dyn UsageRecorder>) -> Self {
        Self { directory, usage }
    }

    /// Device directory.
    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Known keys in configuration order.
    pub fn keys(&self) -> Vec<DeviceKey> {
        self.directory.keys()
    }

    /// Run a parsed request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn dispatch(&self, request: &CommandRequest) -> Result<(), DispatchError> {
        self.execute(&request.id, &request.commands).await
    }

    /// Run `commands` in order on the device registered under `key`.
    ///
    /// Blocks while another batch holds the same device. Every command that
    /// succeeds is reported to the usage recorder before the next one runs.
    ///
    /// # Errors
    ///
    /// - `DispatchError::DestinationNotFound` if `key` is unknown
    /// - `DispatchError::Connection` if the device cannot be reached
    /// - `DispatchError::Input` naming the first command that failed
    pub async fn execute<S: AsRef<str>>(
        &self,
        key: &str,
        commands: &[S],
    ) -> Result<(), DispatchError> {
        let entry = self
            .directory
            .get(key)
            .ok_or_else(|| DispatchError::DestinationNotFound {
                key: key.to_string(),
            })?;

        let mut device = entry.acquire().await;
        debug!(key, commands = commands.len(), "Device acquired");

        if let Err(source) = device.connect().await {
            error!(key, "Device unreachable: {}", source);
            device.release().await;
            return Err(DispatchError::Connection {
                key: key.to_string(),
                source,
            });
        }

        let mut result = Ok(());
        for command in commands {
            let command = command.as_ref();
            match device.send_command(command).await {
                Ok(()) => {
                    info!(key, command, "Command executed");
                    self.usage.record(entry.key(), command);
                }
                Err(source) => {
                    warn!(key, command, "Command failed: {}", source);
                    result = Err(DispatchError::Input {
                        key: key.to_string(),
                        command: command.to_string(),
                        source,
                    });
                    break;
                }
            }
        }

        device.release().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDevice, MockDeviceHandle};
    use crate::usage::{NoopRecorder, UsageStatistics};

    fn dispatcher(key: &str) -> (Dispatcher, MockDeviceHandle, Arc<UsageStatistics>) {
        let (device, handle) = MockDevice::new(DeviceKey::new(key).unwrap());
        let directory = DeviceDirectory::from_devices(vec![device.into()]).unwrap();
        let stats = Arc::new(UsageStatistics::new());
        (
            Dispatcher::new(Arc::new(directory), stats.clone()),
            handle,
            stats,
        )
    }

    #[tokio::test]
    async fn test_unknown_key_takes_no_lock() {
        let (dispatcher, handle, _) = dispatcher("front-door");

        let err = dispatcher.execute("back-door", &["OPEN"]).await.unwrap_err();
        assert!(matches!(err, DispatchError::DestinationNotFound { ref key } if key == "back-door"));
        assert_eq!(dispatcher.directory().get("front-door").unwrap().acquisitions(), 0);
        assert_eq!(handle.connects(), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_batch() {
        let (dispatcher, handle, stats) = dispatcher("front-door");
        handle.reject("OPEN");

        let err = dispatcher
            .execute("front-door", &["HOME", "OPEN", "5"])
            .await
            .unwrap_err();

        assert_eq!(err.command(), Some("OPEN"));
        assert_eq!(err.key(), "front-door");
        assert_eq!(handle.sent(), vec!["HOME"]);
        assert_eq!(stats.count("front-door", "HOME"), 1);
        assert_eq!(stats.count("front-door", "OPEN"), 0);
        assert_eq!(stats.total(), 1);
        assert_eq!(handle.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_releases_device() {
        let (dispatcher, handle, stats) = dispatcher("front-door");
        handle.set_fail_connect(true);

        let err = dispatcher.execute("front-door", &["HOME"]).await.unwrap_err();
        assert!(matches!(err, DispatchError::Connection { .. }));
        assert!(!dispatcher.directory().get("front-door").unwrap().is_held());
        assert!(handle.sent().is_empty());
        assert_eq!(stats.total(), 0);

        // The device works again once reachable
        handle.set_fail_connect(false);
        dispatcher.execute("front-door", &["HOME"]).await.unwrap();
        assert_eq!(handle.sent(), vec!["HOME"]);
    }

    #[tokio::test]
    async fn test_empty_batch_opens_and_closes() {
        let (dispatcher, handle, _) = dispatcher("front-door");
        let commands: [&str; 0] = [];

        dispatcher.execute("front-door", &commands).await.unwrap();
        assert_eq!(handle.connects(), 1);
        assert_eq!(handle.closes(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_request() {
        let (device, handle) = MockDevice::new(DeviceKey::new("front-door").unwrap());
        let directory = DeviceDirectory::from_devices(vec![device.into()]).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(directory), Arc::new(NoopRecorder));

        let request = CommandRequest::new("front-door", ["HOME", "1", "2"]);
        dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(handle.sent(), vec!["HOME", "1", "2"]);
        assert_eq!(dispatcher.keys(), vec![DeviceKey::new("front-door").unwrap()]);
    }
}
