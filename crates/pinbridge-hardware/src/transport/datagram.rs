//! UDP command channel for discovered devices.
//!
//! Frames on the command port carry the shared magic token and the target
//! hardware address, so a device can ignore traffic meant for its
//! neighbours:
//!
//! ```text
//! command: ┌───────┬──────────────┬────────────┐
//!          │ magic │ MAC (6 bytes)│ code bytes │
//!          └───────┴──────────────┴────────────┘
//! status:  ┌───────┬──────────────┬─────────────┐
//!          │ magic │ MAC (6 bytes)│ status byte │
//!          └───────┴──────────────┴─────────────┘
//! ```
//!
//! A status of `0x00` acknowledges the command. Replies from other sources
//! or for other hardware addresses are skipped until the timeout.

use crate::error::{HardwareError, Result};
use pinbridge_core::constants::{HARDWARE_ADDRESS_LEN, MAX_DATAGRAM_LEN};
use pinbridge_core::{HardwareAddress, MagicToken};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Build a command frame.
///
/// # Examples
///
/// ```
/// use pinbridge_hardware::transport::datagram::encode_command;
/// use pinbridge_core::{HardwareAddress, MagicToken};
///
/// let magic = MagicToken::new("AXHW").unwrap();
/// let mac = HardwareAddress::new([0, 0x1b, 0xc5, 0, 0, 1]);
///
/// let frame = encode_command(&magic, &mac, "C1");
/// assert_eq!(frame, b"AXHW\x00\x1b\xc5\x00\x00\x01C1");
/// ```
pub fn encode_command(magic: &MagicToken, address: &HardwareAddress, code: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(magic.len() + HARDWARE_ADDRESS_LEN + code.len());
    frame.extend_from_slice(magic.as_bytes());
    frame.extend_from_slice(address.as_bytes());
    frame.extend_from_slice(code.as_bytes());
    frame
}

/// Extract the status byte from a reply meant for `address`.
///
/// Returns `None` for anything that is not a well-formed status frame for
/// that address.
pub fn parse_status(magic: &MagicToken, address: &HardwareAddress, datagram: &[u8]) -> Option<u8> {
    let payload = magic.strip(datagram)?;
    match payload {
        [mac @ .., status] if mac == address.as_bytes() => Some(*status),
        _ => None,
    }
}

/// Connected UDP socket addressing one device.
#[derive(Debug)]
pub struct DatagramChannel {
    socket: UdpSocket,
    remote: SocketAddrV4,
    magic: MagicToken,
    address: HardwareAddress,
    timeout: Duration,
}

impl DatagramChannel {
    /// Bind on `local_ip` and connect to the device's command endpoint.
    ///
    /// Connecting the socket makes the OS drop datagrams from any other
    /// source.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Io` if the socket cannot be bound or
    /// connected.
    pub async fn open(
        local_ip: Ipv4Addr,
        remote: SocketAddrV4,
        magic: MagicToken,
        address: HardwareAddress,
        timeout: Duration,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(local_ip, 0))).await?;
        socket.connect(SocketAddr::V4(remote)).await?;
        debug!(%address, %remote, "Command channel open");

        Ok(Self {
            socket,
            remote,
            magic,
            address,
            timeout,
        })
    }

    /// Device command endpoint.
    pub fn remote(&self) -> SocketAddrV4 {
        self.remote
    }

    /// Send one command code and wait for the matching status byte.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if no matching status arrives in
    /// time, or `HardwareError::Io` on socket failure.
    pub async fn request(&self, code: &str) -> Result<u8> {
        let frame = encode_command(&self.magic, &self.address, code);
        self.socket.send(&frame).await?;
        trace!(address = %self.address, code, "Command sent");

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; MAX_DATAGRAM_LEN];

        loop {
            let len = match tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(HardwareError::timeout(self.timeout.as_millis() as u64));
                }
            };

            match parse_status(&self.magic, &self.address, &buf[..len]) {
                Some(status) => return Ok(status),
                None => debug!(address = %self.address, "Ignoring unrelated reply"),
            }
        }
    }
}
