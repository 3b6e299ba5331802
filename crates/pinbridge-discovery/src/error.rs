//! Error types for discovery operations.

use pinbridge_core::HardwareAddress;
use std::net::SocketAddr;

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur while discovering or resolving devices.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// No binding exists for the address, even after a discovery round.
    #[error("Device {address} not found on any interface")]
    NotFound { address: HardwareAddress },

    /// The probe socket could not be bound.
    #[error("Failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Local network interfaces could not be enumerated.
    #[error("Failed to enumerate network interfaces: {0}")]
    Interfaces(std::io::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Create a new not found error.
    pub fn not_found(address: HardwareAddress) -> Self {
        Self::NotFound { address }
    }

    /// Returns `true` if the error means "device not currently reachable".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
