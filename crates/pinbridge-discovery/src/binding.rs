//! Address bindings learned from discovery replies.

use crate::interfaces::NetworkInterface;
use chrono::{DateTime, SecondsFormat, Utc};
use pinbridge_core::HardwareAddress;
use std::net::Ipv4Addr;

/// Learned mapping from a hardware address to its current endpoint.
///
/// A binding is never merged with an older one: the registry replaces the
/// whole binding whenever a newer reply for the same address arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBinding {
    /// Hardware address the device replied with.
    pub address: HardwareAddress,

    /// Source IP of the reply.
    pub ip: Ipv4Addr,

    /// Interface the probe went out on.
    pub interface: NetworkInterface,

    /// When the reply was received.
    pub learned_at: DateTime<Utc>,
}

impl AddressBinding {
    /// Create a binding stamped with the current time.
    pub fn new(address: HardwareAddress, ip: Ipv4Addr, interface: NetworkInterface) -> Self {
        Self {
            address,
            ip,
            interface,
            learned_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for AddressBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} via {} (learned {})",
            self.address,
            self.ip,
            self.interface,
            self.learned_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}
