//! Error types for device operations.
//!
//! This module defines error types specific to device operations, covering
//! unreachable devices, timeouts, rejected commands and startup failures.

use pinbridge_core::HardwareAddress;

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Command token has no entry in the device layout.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// Device answered with something other than an acknowledgement.
    #[error("Command {command} rejected by device: {reply}")]
    Rejected { command: String, reply: String },

    /// Hardware address could not be resolved to an endpoint.
    #[error("Device {address} not resolved")]
    NotResolved { address: HardwareAddress },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Two configured devices share a key.
    #[error("Duplicate device key: {key}")]
    DuplicateKey { key: String },

    /// No configured device survived initialization.
    #[error("No device could be initialized")]
    NoDevices,

    /// Invalid value in shared types.
    #[error(transparent)]
    Core(#[from] pinbridge_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Create a new rejected command error.
    pub fn rejected(command: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            reply: reply.into(),
        }
    }

    /// Create a new not resolved error.
    pub fn not_resolved(address: HardwareAddress) -> Self {
        Self::NotResolved { address }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
