//! Integration tests for UdpDiscovery
//!
//! A local UDP responder stands in for a device: it answers probes that carry
//! the right magic token with its hardware address.

use pinbridge_core::{HardwareAddress, MagicToken};
use pinbridge_discovery::{BroadcastTarget, NetworkInterface, UdpDiscovery, UdpDiscoveryConfig};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;

const DEVICE_MAC: [u8; 6] = [0x00, 0x1b, 0xc5, 0x00, 0x00, 0x01];

fn loopback_target() -> BroadcastTarget {
    BroadcastTarget {
        interface: NetworkInterface::new("lo", Ipv4Addr::LOCALHOST),
        broadcast: Ipv4Addr::LOCALHOST,
    }
}

/// Spawn a responder that answers one probe with the given datagrams.
async fn spawn_responder(magic: &'static [u8], replies: Vec<Vec<u8>>) -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (len, src) = socket.recv_from(&mut buf).await.unwrap();
        if &buf[..len] != magic {
            return;
        }
        for reply in replies {
            socket.send_to(&reply, src).await.unwrap();
        }
    });

    port
}

fn reply(magic: &[u8], mac: &[u8]) -> Vec<u8> {
    [magic, mac].concat()
}

#[tokio::test]
async fn test_discovers_responding_device() {
    let port = spawn_responder(b"AXHW", vec![reply(b"AXHW", &DEVICE_MAC)]).await;

    let client = UdpDiscovery::new(UdpDiscoveryConfig {
        magic: MagicToken::new("AXHW").unwrap(),
        port,
        window: Duration::from_millis(300),
    });

    let bindings = client.discover_on(vec![loopback_target()]).collect().await;

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].address, HardwareAddress::new(DEVICE_MAC));
    assert_eq!(bindings[0].ip, Ipv4Addr::LOCALHOST);
    assert_eq!(bindings[0].interface.name, "lo");
}

#[tokio::test]
async fn test_malformed_replies_are_dropped() {
    let port = spawn_responder(
        b"AXHW",
        vec![
            b"garbage".to_vec(),
            reply(b"XXXX", &DEVICE_MAC),
            reply(b"AXHW", &DEVICE_MAC[..4]),
            reply(b"AXHW", &DEVICE_MAC),
        ],
    )
    .await;

    let client = UdpDiscovery::new(UdpDiscoveryConfig {
        magic: MagicToken::new("AXHW").unwrap(),
        port,
        window: Duration::from_millis(300),
    });

    let bindings = client.discover_on(vec![loopback_target()]).collect().await;

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].address, HardwareAddress::new(DEVICE_MAC));
}

#[tokio::test]
async fn test_probe_with_wrong_magic_gets_no_answer() {
    let port = spawn_responder(b"OTHER", vec![reply(b"AXHW", &DEVICE_MAC)]).await;

    let client = UdpDiscovery::new(UdpDiscoveryConfig {
        magic: MagicToken::new("AXHW").unwrap(),
        port,
        window: Duration::from_millis(200),
    });

    let bindings = client.discover_on(vec![loopback_target()]).collect().await;
    assert!(bindings.is_empty());
}

#[tokio::test]
async fn test_round_yields_lazily() {
    let port = spawn_responder(b"AXHW", vec![reply(b"AXHW", &DEVICE_MAC)]).await;

    let client = UdpDiscovery::new(UdpDiscoveryConfig {
        magic: MagicToken::new("AXHW").unwrap(),
        port,
        window: Duration::from_secs(2),
    });

    let mut round = client.discover_on(vec![loopback_target()]);

    // The first binding arrives well before the window closes
    let first = tokio::time::timeout(Duration::from_millis(500), round.next())
        .await
        .expect("binding should arrive before the window closes");
    assert!(first.is_some());
}
