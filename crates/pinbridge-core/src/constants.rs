//! Protocol and runtime constants shared across the gateway.
//!
//! # Discovery Datagrams
//!
//! Discovery uses two datagram shapes, both prefixed with the shared
//! [`MagicToken`](crate::MagicToken):
//!
//! ```text
//! probe:  <MAGIC>
//! reply:  <MAGIC><MAC0><MAC1><MAC2><MAC3><MAC4><MAC5>
//! ```
//!
//! # Command Datagrams
//!
//! Discovered devices (multiplexers, magstripe readers) take commands over
//! UDP, addressed by hardware address so that a stale IP never reaches the
//! wrong device:
//!
//! ```text
//! command:  <MAGIC><MAC x6><CODE...>
//! status:   <MAGIC><MAC x6><STATUS>
//! ```
//!
//! # Usage
//!
//! ```
//! use pinbridge_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(HARDWARE_ADDRESS_LEN, 6);
//! let window = Duration::from_millis(DEFAULT_DISCOVERY_WINDOW_MS);
//! assert!(window.as_millis() > 0);
//! ```

// ============================================================================
// Addressing
// ============================================================================

/// Length of a hardware (MAC) address in bytes.
pub const HARDWARE_ADDRESS_LEN: usize = 6;

/// Separators accepted when parsing a textual hardware address.
pub const HARDWARE_ADDRESS_SEPARATORS: [char; 2] = [':', '-'];

/// Maximum length of a magic token in bytes.
pub const MAX_MAGIC_LEN: usize = 32;

/// Magic token used when the configuration does not provide one.
pub const DEFAULT_MAGIC: &str = "AXHW";

// ============================================================================
// Discovery
// ============================================================================

/// UDP port devices listen on for discovery probes.
pub const DEFAULT_DISCOVERY_PORT: u16 = 30303;

/// Time window (ms) during which discovery replies are collected.
pub const DEFAULT_DISCOVERY_WINDOW_MS: u64 = 1000;

/// Receive buffer size for a single datagram.
pub const MAX_DATAGRAM_LEN: usize = 512;

// ============================================================================
// Transport
// ============================================================================

/// UDP port discovered devices listen on for commands.
pub const DEFAULT_COMMAND_PORT: u16 = 30304;

/// Timeout (ms) applied to connect, send and acknowledgement waits.
pub const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 3000;

/// Reply line a terminal sends to acknowledge a command.
pub const TERMINAL_ACK: &str = "OK";

/// Status byte a discovered device sends to acknowledge a command.
pub const STATUS_OK: u8 = 0x00;

/// Command sent to a terminal after its first successful connection.
pub const CALIBRATION_COMMAND: &str = "HOME";

// ============================================================================
// Front-end
// ============================================================================

/// Default HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 8000;
