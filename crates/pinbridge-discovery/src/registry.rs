//! Process-wide discovery cache.
//!
//! The [`DiscoveryRegistry`] maps hardware addresses to the latest
//! [`AddressBinding`] heard for them. It is created once at startup, shared
//! through an `Arc` with every device that needs it, and filled lazily: a
//! lookup miss triggers one discovery round before giving up.
//!
//! # Merge Policy
//!
//! Updates always overwrite by hardware address. There is no timestamp
//! comparison, so when two rounds triggered by different devices overlap,
//! the round that finishes last wins even if its reply was older. Bindings
//! never expire; a stale one is only replaced by a fresh reply.
//!
//! # Examples
//!
//! ```no_run
//! use pinbridge_discovery::{DiscoveryRegistry, DiscoverySource, UdpDiscovery, UdpDiscoveryConfig};
//!
//! # async fn example() -> pinbridge_discovery::Result<()> {
//! let source = DiscoverySource::Udp(UdpDiscovery::new(UdpDiscoveryConfig::default()));
//! let registry = DiscoveryRegistry::new(source);
//!
//! let binding = registry.resolve("00:1b:c5:00:00:01".parse().unwrap()).await?;
//! println!("Device at {}", binding.ip);
//! # Ok(())
//! # }
//! ```

#![allow(async_fn_in_trait)]

use crate::binding::AddressBinding;
use crate::client::{DiscoveryRound, UdpDiscovery};
use crate::error::{DiscoveryError, Result};
use pinbridge_core::HardwareAddress;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Anything that can run a discovery round.
pub trait DiscoveryProtocol: Send + Sync {
    /// Run one round and return its replies as a lazy sequence.
    async fn discover(&self) -> DiscoveryRound;
}

impl DiscoveryProtocol for UdpDiscovery {
    async fn discover(&self) -> DiscoveryRound {
        UdpDiscovery::discover(self).await
    }
}

/// Enum wrapper for discovery source dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum DiscoverySource {
    /// Broadcast probes over UDP.
    Udp(UdpDiscovery),

    /// Scripted replies for development and testing.
    Mock(MockDiscovery),
}

impl DiscoveryProtocol for DiscoverySource {
    async fn discover(&self) -> DiscoveryRound {
        match self {
            Self::Udp(source) => source.discover().await,
            Self::Mock(source) => source.discover().await,
        }
    }
}

/// Shared hardware address to endpoint cache.
#[derive(Debug)]
pub struct DiscoveryRegistry {
    /// Latest binding per hardware address.
    bindings: RwLock<HashMap<HardwareAddress, AddressBinding>>,

    /// Where discovery rounds come from.
    source: DiscoverySource,

    /// Number of rounds run so far.
    rounds: AtomicU64,
}

impl DiscoveryRegistry {
    /// Create an empty registry.
    pub fn new(source: DiscoverySource) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            source,
            rounds: AtomicU64::new(0),
        }
    }

    /// Create an empty registry ready to be shared.
    pub fn shared(source: DiscoverySource) -> Arc<Self> {
        Arc::new(Self::new(source))
    }

    /// Cached binding for `address`, without triggering discovery.
    pub async fn lookup(&self, address: &HardwareAddress) -> Option<AddressBinding> {
        self.bindings.read().await.get(address).cloned()
    }

    /// Resolve `address` to its endpoint.
    ///
    /// Returns the cached binding if there is one. Otherwise runs one
    /// discovery round, merges every reply, and looks again.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::NotFound` if the address is still unknown
    /// after the round.
    pub async fn resolve(&self, address: HardwareAddress) -> Result<AddressBinding> {
        if let Some(binding) = self.lookup(&address).await {
            return Ok(binding);
        }

        debug!(%address, "Cache miss, running discovery");
        self.refresh().await;

        self.lookup(&address)
            .await
            .ok_or_else(|| DiscoveryError::not_found(address))
    }

    /// Run one discovery round and merge every reply.
    ///
    /// Returns the number of bindings merged.
    pub async fn refresh(&self) -> usize {
        self.rounds.fetch_add(1, Ordering::Relaxed);

        let mut round = self.source.discover().await;
        let mut merged = 0;
        while let Some(binding) = round.next().await {
            self.update(binding).await;
            merged += 1;
        }

        info!("Discovery round merged {} bindings", merged);
        merged
    }

    /// Insert or replace the binding for its hardware address.
    pub async fn update(&self, binding: AddressBinding) {
        let mut bindings = self.bindings.write().await;
        if let Some(previous) = bindings.get(&binding.address)
            && previous.ip != binding.ip
        {
            info!(
                address = %binding.address,
                old_ip = %previous.ip,
                new_ip = %binding.ip,
                previous_learned_at = %previous.learned_at,
                "Device changed address"
            );
        }
        bindings.insert(binding.address, binding);
    }

    /// Number of cached bindings.
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    /// Returns `true` if nothing has been discovered yet.
    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }

    /// Number of discovery rounds run so far.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }
}

/// Scripted discovery source for testing without a network.
///
/// Each round yields the replies currently scripted through the
/// [`MockDiscoveryHandle`].
///
/// # Examples
///
/// ```
/// use pinbridge_discovery::{AddressBinding, DiscoveryRegistry, DiscoverySource, MockDiscovery};
/// use pinbridge_discovery::interfaces::NetworkInterface;
/// use std::net::Ipv4Addr;
///
/// #[tokio::main]
/// async fn main() {
///     let (mock, handle) = MockDiscovery::new();
///     let registry = DiscoveryRegistry::new(DiscoverySource::Mock(mock));
///
///     let mac = "00:1b:c5:00:00:01".parse().unwrap();
///     handle.set_replies(vec![AddressBinding::new(
///         mac,
///         Ipv4Addr::new(10, 0, 0, 20),
///         NetworkInterface::new("eth0", Ipv4Addr::new(10, 0, 0, 5)),
///     )]);
///
///     let binding = registry.resolve(mac).await.unwrap();
///     assert_eq!(binding.ip, Ipv4Addr::new(10, 0, 0, 20));
///     assert_eq!(handle.rounds(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockDiscovery {
    state: Arc<Mutex<MockDiscoveryState>>,
}

#[derive(Debug, Default)]
struct MockDiscoveryState {
    replies: Vec<AddressBinding>,
    rounds: u64,
}

impl MockDiscovery {
    /// Create a mock source with no replies.
    pub fn new() -> (Self, MockDiscoveryHandle) {
        let state = Arc::new(Mutex::new(MockDiscoveryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockDiscoveryHandle { state },
        )
    }

    /// Run one round with the currently scripted replies.
    pub async fn discover(&self) -> DiscoveryRound {
        let replies = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.rounds += 1;
            state.replies.clone()
        };
        DiscoveryRound::from_bindings(replies)
    }
}

/// Handle for scripting a [`MockDiscovery`].
#[derive(Debug, Clone)]
pub struct MockDiscoveryHandle {
    state: Arc<Mutex<MockDiscoveryState>>,
}

impl MockDiscoveryHandle {
    /// Replace the replies every following round yields.
    pub fn set_replies(&self, replies: Vec<AddressBinding>) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replies = replies;
    }

    /// Number of rounds run against the mock.
    pub fn rounds(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::NetworkInterface;
    use std::net::Ipv4Addr;

    fn mac(last: u8) -> HardwareAddress {
        HardwareAddress::new([0x00, 0x1b, 0xc5, 0x00, 0x00, last])
    }

    fn binding(last: u8, ip: [u8; 4]) -> AddressBinding {
        AddressBinding::new(
            mac(last),
            Ipv4Addr::from(ip),
            NetworkInterface::new("eth0", Ipv4Addr::new(10, 0, 0, 5)),
        )
    }

    fn mock_registry() -> (DiscoveryRegistry, MockDiscoveryHandle) {
        let (mock, handle) = MockDiscovery::new();
        (DiscoveryRegistry::new(DiscoverySource::Mock(mock)), handle)
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_skips_discovery() {
        let (registry, handle) = mock_registry();
        registry.update(binding(1, [10, 0, 0, 20])).await;

        let found = registry.resolve(mac(1)).await.unwrap();
        assert_eq!(found.ip, Ipv4Addr::new(10, 0, 0, 20));
        assert_eq!(handle.rounds(), 0);
    }

    #[tokio::test]
    async fn test_resolve_miss_runs_one_round_and_merges_all() {
        let (registry, handle) = mock_registry();
        handle.set_replies(vec![binding(1, [10, 0, 0, 20]), binding(2, [10, 0, 0, 21])]);

        let found = registry.resolve(mac(2)).await.unwrap();
        assert_eq!(found.ip, Ipv4Addr::new(10, 0, 0, 21));
        assert_eq!(handle.rounds(), 1);
        assert_eq!(registry.len().await, 2);

        // The other device was merged by the same round
        registry.resolve(mac(1)).await.unwrap();
        assert_eq!(handle.rounds(), 1);
    }

    #[tokio::test]
    async fn test_resolve_without_replies_is_not_found() {
        let (registry, handle) = mock_registry();

        let result = registry.resolve(mac(9)).await;
        assert!(matches!(result, Err(DiscoveryError::NotFound { .. })));
        assert_eq!(handle.rounds(), 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_latest_write_wins() {
        let (registry, _handle) = mock_registry();
        registry.update(binding(1, [10, 0, 0, 20])).await;
        registry.update(binding(1, [10, 0, 0, 99])).await;

        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.lookup(&mac(1)).await.unwrap().ip,
            Ipv4Addr::new(10, 0, 0, 99)
        );
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let (registry, _handle) = mock_registry();
        let b = binding(1, [10, 0, 0, 20]);
        registry.update(b.clone()).await;
        registry.update(b.clone()).await;

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.lookup(&mac(1)).await, Some(b));
    }

    #[tokio::test]
    async fn test_concurrent_rounds_merge_safely() {
        let (mock, handle) = MockDiscovery::new();
        let registry = DiscoveryRegistry::shared(DiscoverySource::Mock(mock));
        handle.set_replies((1..=8).map(|i| binding(i, [10, 0, 0, 20 + i])).collect());

        let mut tasks = Vec::new();
        for i in 1..=8u8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move { registry.resolve(mac(i)).await }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(registry.len().await, 8);
        assert!(handle.rounds() >= 1);
        assert_eq!(registry.rounds(), handle.rounds());
    }
}
