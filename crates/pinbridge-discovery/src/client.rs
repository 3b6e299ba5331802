//! UDP broadcast discovery client.
//!
//! A discovery round sends one probe per qualifying local interface and then
//! listens on each probe socket for a bounded window. Devices answer with
//! their hardware address, and every valid reply becomes one
//! [`AddressBinding`].
//!
//! ```text
//!  eth0 ──probe──> 192.168.1.255:30303 ──┐
//!                                        ├──> replies ──> DiscoveryRound
//!  eth1 ──probe──> 10.0.0.255:30303 ─────┘
//! ```
//!
//! The probe is best effort. Malformed or foreign replies are dropped, socket
//! failures on one interface only silence that interface, and a round that
//! hears nothing simply yields nothing.

use crate::binding::AddressBinding;
use crate::error::{DiscoveryError, Result};
use crate::interfaces::{self, BroadcastTarget};
use pinbridge_core::constants::{
    DEFAULT_DISCOVERY_PORT, DEFAULT_DISCOVERY_WINDOW_MS, DEFAULT_MAGIC, HARDWARE_ADDRESS_LEN,
    MAX_DATAGRAM_LEN,
};
use pinbridge_core::{HardwareAddress, MagicToken};
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Configuration for UDP discovery.
///
/// # Example
///
/// ```
/// use pinbridge_discovery::UdpDiscoveryConfig;
/// use pinbridge_core::MagicToken;
/// use std::time::Duration;
///
/// let config = UdpDiscoveryConfig {
///     magic: MagicToken::new("AXHW").unwrap(),
///     port: 30303,
///     window: Duration::from_millis(500),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct UdpDiscoveryConfig {
    /// Token carried by probes and expected at the start of replies.
    pub magic: MagicToken,

    /// Port devices listen on for probes.
    pub port: u16,

    /// How long to collect replies after the probe is sent.
    pub window: Duration,
}

impl Default for UdpDiscoveryConfig {
    fn default() -> Self {
        Self {
            magic: MagicToken::new(DEFAULT_MAGIC).expect("default magic token is valid"),
            port: DEFAULT_DISCOVERY_PORT,
            window: Duration::from_millis(DEFAULT_DISCOVERY_WINDOW_MS),
        }
    }
}

/// One discovery round in progress.
///
/// Yields bindings as replies arrive and ends once every probe's reply window
/// has elapsed. A round cannot be restarted; start a new one to re-probe.
#[derive(Debug)]
pub struct DiscoveryRound {
    rx: mpsc::Receiver<AddressBinding>,
}

impl DiscoveryRound {
    /// Wrap the receiving end of a round's reply channel.
    ///
    /// The round ends when every sender has been dropped.
    pub fn new(rx: mpsc::Receiver<AddressBinding>) -> Self {
        Self { rx }
    }

    /// A round that yields nothing.
    pub fn empty() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self { rx }
    }

    /// A round that yields the given bindings in order.
    pub fn from_bindings(bindings: Vec<AddressBinding>) -> Self {
        let (tx, rx) = mpsc::channel(bindings.len().max(1));
        for binding in bindings {
            // Capacity covers every binding, so this cannot fail.
            let _ = tx.try_send(binding);
        }
        Self { rx }
    }

    /// Wait for the next binding, or `None` once the round is over.
    pub async fn next(&mut self) -> Option<AddressBinding> {
        self.rx.recv().await
    }

    /// Drain the round into a vector.
    pub async fn collect(mut self) -> Vec<AddressBinding> {
        let mut bindings = Vec::new();
        while let Some(binding) = self.next().await {
            bindings.push(binding);
        }
        bindings
    }
}

/// Extract the hardware address from a discovery reply.
///
/// A valid reply is the magic token followed by exactly six address bytes.
///
/// # Examples
///
/// ```
/// use pinbridge_discovery::client::parse_reply;
/// use pinbridge_core::MagicToken;
///
/// let magic = MagicToken::new("AXHW").unwrap();
/// let reply = b"AXHW\x00\x1b\xc5\x00\x00\x01";
///
/// let mac = parse_reply(&magic, reply).unwrap();
/// assert_eq!(mac.to_string(), "00:1b:c5:00:00:01");
///
/// assert!(parse_reply(&magic, b"AXHW").is_none());
/// ```
pub fn parse_reply(magic: &MagicToken, datagram: &[u8]) -> Option<HardwareAddress> {
    let payload = magic.strip(datagram)?;
    if payload.len() != HARDWARE_ADDRESS_LEN {
        return None;
    }
    HardwareAddress::from_slice(payload).ok()
}

/// Discovery client that probes local broadcast domains over UDP.
#[derive(Debug, Clone)]
pub struct UdpDiscovery {
    config: UdpDiscoveryConfig,
}

impl UdpDiscovery {
    /// Create a new client.
    pub fn new(config: UdpDiscoveryConfig) -> Self {
        Self { config }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &UdpDiscoveryConfig {
        &self.config
    }

    /// Start a round on every qualifying local interface.
    ///
    /// If interfaces cannot be enumerated or none qualify, the round is
    /// empty.
    pub async fn discover(&self) -> DiscoveryRound {
        match interfaces::broadcast_targets() {
            Ok(targets) => self.discover_on(targets),
            Err(e) => {
                warn!("Discovery skipped: {}", e);
                DiscoveryRound::empty()
            }
        }
    }

    /// Start a round on an explicit set of targets.
    ///
    /// Must be called from within a Tokio runtime: one task is spawned per
    /// target.
    pub fn discover_on(&self, targets: Vec<BroadcastTarget>) -> DiscoveryRound {
        if targets.is_empty() {
            debug!("No broadcast-capable interfaces, discovery round is empty");
            return DiscoveryRound::empty();
        }

        info!(
            magic = %self.config.magic,
            port = self.config.port,
            interfaces = targets.len(),
            "Starting discovery round"
        );

        let (tx, rx) = mpsc::channel(64);
        for target in targets {
            let tx = tx.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                let name = target.interface.name.clone();
                if let Err(e) = probe_interface(target, config, tx).await {
                    warn!(interface = %name, "Discovery probe failed: {}", e);
                }
            });
        }

        DiscoveryRound::new(rx)
    }
}

/// Probe one interface and forward its replies until the window closes.
async fn probe_interface(
    target: BroadcastTarget,
    config: UdpDiscoveryConfig,
    tx: mpsc::Sender<AddressBinding>,
) -> Result<()> {
    let bind_addr = SocketAddr::V4(SocketAddrV4::new(target.interface.local_ip, 0));
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|source| DiscoveryError::BindFailed {
            addr: bind_addr,
            source,
        })?;
    socket.set_broadcast(true)?;

    let dest = SocketAddrV4::new(target.broadcast, config.port);
    socket.send_to(config.magic.as_bytes(), dest).await?;
    trace!(interface = %target.interface, %dest, "Probe sent");

    let deadline = Instant::now() + config.window;
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    loop {
        let (len, src) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                debug!(interface = %target.interface.name, "Discovery recv error: {}", e);
                break;
            }
            // Window elapsed
            Err(_) => break,
        };

        let Some(address) = parse_reply(&config.magic, &buf[..len]) else {
            debug!("Dropping malformed discovery reply from {}", src);
            continue;
        };

        let IpAddr::V4(ip) = src.ip() else {
            debug!("Dropping discovery reply from non-IPv4 source {}", src);
            continue;
        };

        let binding = AddressBinding::new(address, ip, target.interface.clone());
        debug!("Discovered {}", binding);

        if tx.send(binding).await.is_err() {
            // Round dropped by the consumer
            break;
        }
    }

    Ok(())
}
