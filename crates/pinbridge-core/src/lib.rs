//! Shared value types for the pinbridge device gateway.
//!
//! Every other crate in the workspace addresses devices through the types
//! defined here: the [`DeviceKey`] a client names in a request, the
//! [`HardwareAddress`] a discovered device answers with, and the
//! [`MagicToken`] that identifies the discovery protocol family on the wire.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
