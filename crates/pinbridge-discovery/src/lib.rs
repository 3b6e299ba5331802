//! Device discovery for the pinbridge gateway.
//!
//! Multiplexers and magstripe readers are addressed by hardware address
//! because their IP may change across restarts. This crate finds them:
//!
//! - [`UdpDiscovery`] broadcasts a probe carrying the shared
//!   [`MagicToken`](pinbridge_core::MagicToken) on every qualifying local
//!   interface and turns replies into [`AddressBinding`]s.
//! - [`DiscoveryRegistry`] caches the latest binding per hardware address
//!   and runs a round on a cache miss.
//!
//! # Example
//!
//! ```no_run
//! use pinbridge_discovery::{DiscoveryRegistry, DiscoverySource, UdpDiscovery, UdpDiscoveryConfig};
//!
//! # async fn example() {
//! let registry = DiscoveryRegistry::shared(DiscoverySource::Udp(UdpDiscovery::new(
//!     UdpDiscoveryConfig::default(),
//! )));
//!
//! let merged = registry.refresh().await;
//! println!("{merged} devices answered");
//! # }
//! ```

pub mod binding;
pub mod client;
pub mod error;
pub mod interfaces;
pub mod registry;

pub use binding::AddressBinding;
pub use client::{DiscoveryRound, UdpDiscovery, UdpDiscoveryConfig};
pub use error::{DiscoveryError, Result};
pub use interfaces::{BroadcastTarget, NetworkInterface};
pub use registry::{
    DiscoveryProtocol, DiscoveryRegistry, DiscoverySource, MockDiscovery, MockDiscoveryHandle,
};
