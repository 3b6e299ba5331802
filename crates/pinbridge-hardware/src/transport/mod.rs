//! Device transports.
//!
//! - [`LineTransport`]: TCP session framed as text lines, used by terminals.
//! - [`DatagramChannel`]: UDP request/status exchange, used by devices
//!   located through discovery.
//!
//! Both bound every wait by the configured transport timeout and close
//! idempotently.

pub mod datagram;
pub mod line;

pub use datagram::DatagramChannel;
pub use line::LineTransport;
