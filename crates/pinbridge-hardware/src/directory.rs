//! Device directory.
//!
//! Maps logical keys to device entries. The directory is built once at
//! startup and never changes afterwards, so lookups need no locking; each
//! entry carries its own lock serializing sessions on that one device.
//!
//! Holding the lock is represented by a [`DeviceSession`]. A session always
//! ends with the device closed: either through [`DeviceSession::release`], or,
//! when the session is dropped early (its task was cancelled), through a
//! background close that keeps the lock until the device is closed.
//!
//! ```text
//! DeviceDirectory
//!   ├─ "front-door" ─> DeviceEntry { Mutex<AnyDevice::Terminal> }
//!   ├─ "mux-1"      ─> DeviceEntry { Mutex<AnyDevice::Multiplexer> }
//!   └─ "reader-1"   ─> DeviceEntry { Mutex<AnyDevice::Magstripe> }
//! ```

use crate::config::DeviceConfig;
use crate::devices::{AnyDevice, DeviceContext};
use crate::error::{HardwareError, Result};
use crate::traits::CommandDevice;
use pinbridge_core::{DeviceKey, DeviceKind};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// One device and the lock serializing access to it.
#[derive(Debug)]
pub struct DeviceEntry {
    key: DeviceKey,
    kind: DeviceKind,
    device: Arc<Mutex<AnyDevice>>,
    acquisitions: AtomicU64,
}

impl DeviceEntry {
    /// Wrap a device, taking key and kind from its info.
    pub fn new(device: AnyDevice) -> Self {
        let info = device.info();
        Self {
            key: info.key,
            kind: info.kind,
            device: Arc::new(Mutex::new(device)),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Logical key.
    pub fn key(&self) -> &DeviceKey {
        &self.key
    }

    /// Device kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Wait for exclusive access to the device.
    ///
    /// Waiters are served in FIFO order. The lock is held until the returned
    /// session is released or dropped.
    pub async fn acquire(&self) -> DeviceSession {
        let guard = Arc::clone(&self.device).lock_owned().await;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        DeviceSession {
            key: self.key.clone(),
            guard: Some(guard),
        }
    }

    /// Whether someone currently holds the device.
    pub fn is_held(&self) -> bool {
        self.device.try_lock().is_err()
    }

    /// Number of times the device has been acquired.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// Exclusive access to one device.
///
/// Dereferences to the device it holds.
#[derive(Debug)]
pub struct DeviceSession {
    key: DeviceKey,
    guard: Option<OwnedMutexGuard<AnyDevice>>,
}

impl DeviceSession {
    /// Close the device connection, then unlock the device.
    pub async fn release(mut self) {
        if let Some(device) = self.guard.as_mut() {
            device.close_connection().await;
        }
        self.guard = None;
        debug!(key = %self.key, "Device released");
    }
}

impl Deref for DeviceSession {
    type Target = AnyDevice;

    fn deref(&self) -> &AnyDevice {
        self.guard.as_deref().expect("session holds its guard until release")
    }
}

impl DerefMut for DeviceSession {
    fn deref_mut(&mut self) -> &mut AnyDevice {
        self.guard
            .as_deref_mut()
            .expect("session holds its guard until release")
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        let Some(mut device) = self.guard.take() else {
            return;
        };
        if !device.is_connected() {
            return;
        }

        let key = self.key.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(%key, "Session dropped while connected, closing in background");
                runtime.spawn(async move {
                    device.close_connection().await;
                    debug!(%key, "Device released");
                });
            }
            Err(_) => warn!(%key, "Session dropped outside a runtime, connection not closed"),
        }
    }
}

/// Logical key to device mapping, in configuration order.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    entries: Vec<DeviceEntry>,
    index: HashMap<DeviceKey, usize>,
}

impl DeviceDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device under the key its info reports.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::DuplicateKey` if the key is already taken.
    pub fn insert(&mut self, device: AnyDevice) -> Result<()> {
        let entry = DeviceEntry::new(device);
        if self.index.contains_key(entry.key()) {
            return Err(HardwareError::DuplicateKey {
                key: entry.key().to_string(),
            });
        }

        self.index.insert(entry.key().clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Build a directory from ready devices.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::DuplicateKey` on the first repeated key.
    pub fn from_devices(devices: impl IntoIterator<Item = AnyDevice>) -> Result<Self> {
        let mut directory = Self::new();
        for device in devices {
            directory.insert(device)?;
        }
        Ok(directory)
    }

    /// Initialize every configured device and keep the ones that succeed.
    ///
    /// Devices that fail to initialize, or repeat an earlier key, are logged
    /// and left out.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::NoDevices` if no device could be initialized.
    pub async fn build(configs: &[DeviceConfig], context: &DeviceContext) -> Result<Self> {
        let mut directory = Self::new();

        for config in configs {
            match AnyDevice::initialize(config, context).await {
                Ok(device) => {
                    if let Err(e) = directory.insert(device) {
                        warn!(key = %config.id, "Skipping device: {}", e);
                    }
                }
                Err(e) => {
                    warn!(key = %config.id, kind = %config.kind, "Skipping device: {}", e);
                }
            }
        }

        if directory.is_empty() {
            error!("No device could be initialized");
            return Err(HardwareError::NoDevices);
        }

        info!(
            "Device directory ready with {} of {} configured devices",
            directory.len(),
            configs.len()
        );
        Ok(directory)
    }

    /// Entry for a key.
    pub fn get(&self, key: &str) -> Option<&DeviceEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Keys in configuration order.
    pub fn keys(&self) -> Vec<DeviceKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Entries in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.entries.iter()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the directory holds no device.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
