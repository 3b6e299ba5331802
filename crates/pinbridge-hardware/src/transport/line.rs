//! Line-framed TCP transport.
//!
//! Terminals speak a request/reply text protocol: the gateway writes the
//! command code as one line and the terminal answers with one line, `OK` on
//! success.
//!
//! ```text
//! gateway ── "K#\n" ──> terminal
//! gateway <── "OK\n" ── terminal
//! ```

use crate::error::{HardwareError, Result};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, trace, warn};

/// Longest reply line accepted from a terminal.
const MAX_LINE_LEN: usize = 1024;

/// Bound on flush and shutdown while closing.
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// TCP session exchanging one line per request.
///
/// # Example
///
/// ```no_run
/// use pinbridge_hardware::transport::LineTransport;
/// use std::time::Duration;
///
/// # async fn example() -> pinbridge_hardware::Result<()> {
/// let mut transport = LineTransport::new("10.0.0.12:5000".parse().unwrap(), Duration::from_secs(3));
/// transport.connect().await?;
///
/// let reply = transport.request("H").await?;
/// println!("Terminal answered {reply}");
///
/// transport.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LineTransport {
    /// Terminal address
    addr: SocketAddr,

    /// Framed stream (None if not connected)
    framed: Option<Framed<TcpStream, LinesCodec>>,

    /// Timeout for connect, send and receive
    timeout: Duration,
}

impl LineTransport {
    /// Create a transport. It is not connected until `connect()` is called.
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            addr,
            framed: None,
            timeout,
        }
    }

    /// Remote address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Open the TCP connection.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if the connection is not established
    /// in time, or `HardwareError::Io` if it is refused.
    pub async fn connect(&mut self) -> Result<()> {
        debug!("Connecting to terminal at {}", self.addr);

        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(HardwareError::timeout(self.timeout_ms())),
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.framed = Some(Framed::new(
            stream,
            LinesCodec::new_with_max_length(MAX_LINE_LEN),
        ));
        Ok(())
    }

    /// Send one line and wait for the reply line.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected, if either direction times out, or
    /// if the terminal closes the connection before replying.
    pub async fn request(&mut self, line: &str) -> Result<String> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self
            .framed
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(self.addr.to_string()))?;

        trace!(addr = %self.addr, line, "Sending line");
        match tokio::time::timeout(timeout, framed.send(line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(HardwareError::communication(e.to_string())),
            Err(_) => return Err(HardwareError::timeout(timeout_ms)),
        }

        match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(reply))) => {
                trace!(addr = %self.addr, reply = %reply, "Received line");
                Ok(reply)
            }
            Ok(Some(Err(e))) => Err(HardwareError::communication(e.to_string())),
            Ok(None) => Err(HardwareError::disconnected(self.addr.to_string())),
            Err(_) => Err(HardwareError::timeout(timeout_ms)),
        }
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Close the connection. Idempotent.
    pub async fn close(&mut self) {
        let Some(mut framed) = self.framed.take() else {
            return;
        };

        let flush = SinkExt::<&str>::flush(&mut framed);
        if let Ok(Err(e)) = tokio::time::timeout(CLOSE_TIMEOUT, flush).await {
            warn!("Error flushing during close: {}", e);
        }

        let mut stream = framed.into_inner();
        if let Ok(Err(e)) = tokio::time::timeout(CLOSE_TIMEOUT, stream.shutdown()).await {
            debug!("Error during shutdown: {}", e);
        }

        debug!("Connection to {} closed", self.addr);
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}
