//! Device layer of the pinbridge gateway.
//!
//! This crate turns configured peripherals into devices that execute command
//! tokens, and serializes access to each of them:
//!
//! - [`CommandDevice`] is the contract every device implements: connect, send
//!   commands one by one, close.
//! - [`AnyDevice`] dispatches over the concrete devices: [`PinTerminal`],
//!   [`CardMultiplexer`] and [`MagstripeReader`], plus [`MockDevice`] for
//!   tests.
//! - [`DeviceDirectory`] maps logical keys to devices, each behind its own
//!   lock.
//! - [`Dispatcher`] runs a command batch on one device and always releases
//!   it afterwards.
//!
//! # Example
//!
//! ```no_run
//! use pinbridge_hardware::{DeviceConfig, DeviceContext, DeviceDirectory, Dispatcher, NoopRecorder, TransportConfig};
//! use pinbridge_discovery::{DiscoveryRegistry, DiscoverySource, UdpDiscovery, UdpDiscoveryConfig};
//! use pinbridge_core::MagicToken;
//! use std::sync::Arc;
//!
//! # async fn example(configs: Vec<DeviceConfig>) -> Result<(), Box<dyn std::error::Error>> {
//! let discovery = UdpDiscoveryConfig::default();
//! let context = DeviceContext {
//!     magic: discovery.magic.clone(),
//!     registry: DiscoveryRegistry::shared(DiscoverySource::Udp(UdpDiscovery::new(discovery))),
//!     transport: TransportConfig::default(),
//!     layout_dir: "layouts".into(),
//! };
//!
//! let directory = DeviceDirectory::build(&configs, &context).await?;
//! let dispatcher = Dispatcher::new(Arc::new(directory), Arc::new(NoopRecorder));
//!
//! dispatcher.execute("front-door", &["HOME", "OPEN"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Device operations return [`Result<T>`][error::Result] with
//! [`HardwareError`]. The dispatcher folds those into [`DispatchError`],
//! which tells callers whether the key was unknown, the device unreachable,
//! or which command failed.

pub mod config;
pub mod devices;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod layout;
pub mod mock;
pub mod peripherals;
pub mod traits;
pub mod transport;
pub mod types;
pub mod usage;

pub use config::{DeviceConfig, TransportConfig};
pub use devices::{AnyDevice, DeviceContext};
pub use directory::{DeviceDirectory, DeviceEntry, DeviceSession};
pub use dispatch::{CommandRequest, DispatchError, Dispatcher};
pub use error::{HardwareError, Result};
pub use layout::KeyLayout;
pub use mock::{MockDevice, MockDeviceHandle};
pub use peripherals::{CardMultiplexer, MagstripeReader, PinTerminal};
pub use traits::CommandDevice;
pub use types::DeviceInfo;
pub use usage::{NoopRecorder, UsageRecorder, UsageStatistics};
