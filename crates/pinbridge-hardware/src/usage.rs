//! Usage bookkeeping.
//!
//! The dispatcher reports every acknowledged command to a [`UsageRecorder`].
//! Rejected commands, and the commands a failure prevented from running, are
//! never reported.

use pinbridge_core::DeviceKey;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Receiver of `(key, command)` notifications.
pub trait UsageRecorder: Send + Sync + std::fmt::Debug {
    /// Note one successfully executed command.
    fn record(&self, key: &DeviceKey, command: &str);
}

/// Recorder that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl UsageRecorder for NoopRecorder {
    fn record(&self, _key: &DeviceKey, _command: &str) {}
}

/// One counter of a [`UsageStatistics`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCount {
    pub key: DeviceKey,
    pub command: String,
    pub count: u64,
}

/// In-memory per device, per command counters.
///
/// # Examples
///
/// ```
/// use pinbridge_hardware::usage::{UsageRecorder, UsageStatistics};
/// use pinbridge_core::DeviceKey;
///
/// let stats = UsageStatistics::new();
/// let key = DeviceKey::new("front-door").unwrap();
///
/// stats.record(&key, "OPEN");
/// stats.record(&key, "OPEN");
///
/// assert_eq!(stats.count("front-door", "OPEN"), 2);
/// assert_eq!(stats.count("front-door", "HOME"), 0);
/// ```
#[derive(Debug, Default)]
pub struct UsageStatistics {
    counts: Mutex<HashMap<(DeviceKey, String), u64>>,
}

impl UsageStatistics {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// How often `command` succeeded on `key`.
    pub fn count(&self, key: &str, command: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|((k, c), _)| k.as_str() == key && c == command)
            .map_or(0, |(_, count)| *count)
    }

    /// Total of all counters.
    pub fn total(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// All counters, sorted by key then command.
    pub fn snapshot(&self) -> Vec<UsageCount> {
        let mut counts: Vec<UsageCount> = self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|((key, command), count)| UsageCount {
                key: key.clone(),
                command: command.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by(|a, b| (&a.key, &a.command).cmp(&(&b.key, &b.command)));
        counts
    }
}

impl UsageRecorder for UsageStatistics {
    fn record(&self, key: &DeviceKey, command: &str) {
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((key.clone(), command.to_string()))
            .or_insert(0) += 1;
    }
}
