//! Local network interface selection for discovery probes.
//!
//! A probe only makes sense on an interface that can actually broadcast. An
//! interface qualifies when:
//!
//! - it has a link-layer address (loopback has none), and
//! - it carries an IPv4 address with a broadcast address configured.
//!
//! Point-to-point links configure a peer instead of a broadcast address and
//! are therefore skipped, as are interfaces without IPv4.

use crate::error::{DiscoveryError, Result};
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// The interface a probe went out on, as recorded in an address binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkInterface {
    /// OS interface name (e.g. `eth0`).
    pub name: String,

    /// IPv4 address assigned to the interface.
    pub local_ip: Ipv4Addr,
}

impl NetworkInterface {
    /// Create a new interface reference.
    pub fn new(name: impl Into<String>, local_ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            local_ip,
        }
    }
}

impl std::fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.local_ip)
    }
}

/// One IPv4 configuration of a local interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Config {
    /// Assigned address.
    pub address: Ipv4Addr,

    /// Broadcast address, `None` on point-to-point links.
    pub broadcast: Option<Ipv4Addr>,
}

/// Snapshot of a local interface and its IPv4 configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInterface {
    /// OS interface name.
    pub name: String,

    /// Loopback interfaces carry no link-layer address.
    pub loopback: bool,

    /// IPv4 configurations, possibly empty.
    pub ipv4: Vec<Ipv4Config>,
}

/// Where to send a probe, and which interface it leaves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastTarget {
    /// Interface the probe is bound to.
    pub interface: NetworkInterface,

    /// Destination broadcast address.
    pub broadcast: Ipv4Addr,
}

impl LocalInterface {
    /// Pick the broadcast target of this interface, if it qualifies.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbridge_discovery::interfaces::{Ipv4Config, LocalInterface};
    /// use std::net::Ipv4Addr;
    ///
    /// let eth0 = LocalInterface {
    ///     name: "eth0".to_string(),
    ///     loopback: false,
    ///     ipv4: vec![Ipv4Config {
    ///         address: Ipv4Addr::new(192, 168, 1, 10),
    ///         broadcast: Some(Ipv4Addr::new(192, 168, 1, 255)),
    ///     }],
    /// };
    ///
    /// let target = eth0.broadcast_target().unwrap();
    /// assert_eq!(target.broadcast, Ipv4Addr::new(192, 168, 1, 255));
    /// ```
    pub fn broadcast_target(&self) -> Option<BroadcastTarget> {
        if self.loopback {
            return None;
        }

        self.ipv4
            .iter()
            .find(|config| {
                !config.address.is_unspecified()
                    && config.broadcast.is_some_and(|b| !b.is_unspecified())
            })
            .and_then(|config| {
                Some(BroadcastTarget {
                    interface: NetworkInterface::new(self.name.clone(), config.address),
                    broadcast: config.broadcast?,
                })
            })
    }
}

/// Filter a set of interfaces down to their broadcast targets.
pub fn select_targets(interfaces: &[LocalInterface]) -> Vec<BroadcastTarget> {
    interfaces
        .iter()
        .filter_map(|iface| {
            let target = iface.broadcast_target();
            if target.is_none() {
                trace!(interface = %iface.name, "Skipping interface without broadcast");
            }
            target
        })
        .collect()
}

/// Enumerate local interfaces from the operating system.
///
/// Addresses are grouped by interface name, preserving the order in which
/// the OS reports interfaces.
///
/// # Errors
///
/// Returns `DiscoveryError::Interfaces` if the OS query fails.
pub fn local_interfaces() -> Result<Vec<LocalInterface>> {
    let addrs = get_if_addrs::get_if_addrs().map_err(DiscoveryError::Interfaces)?;

    let mut interfaces: Vec<LocalInterface> = Vec::new();
    for iface in addrs {
        let loopback = iface.is_loopback();
        let index = match interfaces.iter().position(|i| i.name == iface.name) {
            Some(index) => index,
            None => {
                interfaces.push(LocalInterface {
                    name: iface.name.clone(),
                    loopback,
                    ipv4: Vec::new(),
                });
                interfaces.len() - 1
            }
        };

        if let get_if_addrs::IfAddr::V4(v4) = iface.addr {
            interfaces[index].ipv4.push(Ipv4Config {
                address: v4.ip,
                broadcast: v4.broadcast,
            });
        }
    }

    debug!("Found {} local interfaces", interfaces.len());
    Ok(interfaces)
}

/// Broadcast targets of every qualifying local interface.
///
/// # Errors
///
/// Returns `DiscoveryError::Interfaces` if the OS query fails.
pub fn broadcast_targets() -> Result<Vec<BroadcastTarget>> {
    Ok(select_targets(&local_interfaces()?))
}
