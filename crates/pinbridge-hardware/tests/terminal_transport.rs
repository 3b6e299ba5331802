//! PIN terminal against a local TCP stand-in.

use pinbridge_core::constants::CALIBRATION_COMMAND;
use pinbridge_core::DeviceKey;
use pinbridge_hardware::{CommandDevice, HardwareError, KeyLayout, PinTerminal};
use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Terminal stand-in: acknowledges every line except `reject`, and records
/// what it received across connections.
async fn terminal_server(reject: &'static str) -> (SocketAddrV4, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let std::net::SocketAddr::V4(addr) = listener.local_addr().unwrap() else {
        unreachable!()
    };
    let received = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&received);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let reply = if line == reject { "ERR 4\n" } else { "ok\n" };
                    log.lock().unwrap().push(line);
                    write.write_all(reply.as_bytes()).await.unwrap();
                }
            });
        }
    });

    (addr, received)
}

fn layout() -> KeyLayout {
    KeyLayout::new("Front door")
        .with_command(CALIBRATION_COMMAND, "H")
        .with_command("OPEN", "K#")
        .with_command("5", "K5")
}

fn terminal() -> PinTerminal {
    PinTerminal::new(DeviceKey::new("front-door").unwrap(), Duration::from_secs(1))
        .with_layout(layout())
}

#[tokio::test]
async fn test_initialize_connection_calibrates() {
    let (addr, received) = terminal_server("").await;
    let mut terminal = terminal();

    terminal.initialize_connection(addr).await.unwrap();

    assert!(!terminal.is_connected());
    assert_eq!(terminal.endpoint(), Some(addr));
    assert_eq!(*received.lock().unwrap(), vec!["H"]);
}

#[tokio::test]
async fn test_rejected_calibration_is_not_fatal() {
    let (addr, _received) = terminal_server("H").await;
    let mut terminal = terminal();

    assert!(terminal.initialize_connection(addr).await.is_ok());
}

#[tokio::test]
async fn test_session_sends_layout_codes() {
    let (addr, received) = terminal_server("").await;
    let mut terminal = terminal();
    terminal.initialize_connection(addr).await.unwrap();

    assert!(terminal.device_lookup().await);
    terminal.connect().await.unwrap();
    terminal.send_command("5").await.unwrap();
    terminal.send_command("OPEN").await.unwrap();
    terminal.close_connection().await;

    assert_eq!(*received.lock().unwrap(), vec!["H", "K5", "K#"]);
}

#[tokio::test]
async fn test_negative_reply_is_rejection() {
    let (addr, _received) = terminal_server("K#").await;
    let mut terminal = terminal();
    terminal.initialize_connection(addr).await.unwrap();

    terminal.connect().await.unwrap();
    let err = terminal.send_command("OPEN").await.unwrap_err();
    assert!(matches!(
        err,
        HardwareError::Rejected { ref command, ref reply } if command == "OPEN" && reply == "ERR 4"
    ));
    terminal.close_connection().await;
}

#[tokio::test]
async fn test_unreachable_terminal_fails_initialization() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let std::net::SocketAddr::V4(addr) = listener.local_addr().unwrap() else {
            unreachable!()
        };
        addr
    };

    let mut terminal = terminal();
    let err = terminal.initialize_connection(addr).await.unwrap_err();
    assert!(matches!(err, HardwareError::InitializationFailed { .. }));
    assert!(!terminal.is_connected());
}
