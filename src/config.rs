//! Broker configuration.

use crate::error::{PubSubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default per-subscription queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default idle window before an unpolled subscription is reaped (10 minutes).
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Default reaper wake-up interval.
pub const DEFAULT_REAP_INTERVAL_MS: u64 = 1000;

/// What to do when a subscription queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued message to make room.
    #[default]
    DropOldest,
    /// Refuse the incoming message for that subscription only.
    DropNewest,
    /// Close the subscription (slow consumer).
    DropSubscriber,
}

/// Broker configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// When false, every operation fails with `Disabled`.
    pub enabled: bool,

    /// Max queued messages per subscription (None = unbounded).
    /// Default: 10000
    pub queue_capacity: Option<usize>,

    /// Applied when `queue_capacity` is reached.
    pub overflow_policy: OverflowPolicy,

    /// Subscriptions not polled for this long are reaped (None = never).
    /// Default: 10 minutes
    pub idle_timeout_ms: Option<u64>,

    /// How often the background reaper wakes up.
    pub reap_interval_ms: u64,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: Some(DEFAULT_QUEUE_CAPACITY),
            overflow_policy: OverflowPolicy::default(),
            idle_timeout_ms: Some(DEFAULT_IDLE_TIMEOUT_MS),
            reap_interval_ms: DEFAULT_REAP_INTERVAL_MS,
        }
    }
}

impl PubSubConfig {
    /// Unbounded queues and no idle reaping.
    pub fn unbounded() -> Self {
        Self {
            queue_capacity: None,
            idle_timeout_ms: None,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: PubSubConfig = serde_json::from_str(s)
            .map_err(|e| PubSubError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == Some(0) {
            return Err(PubSubError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.reap_interval_ms == 0 {
            return Err(PubSubError::InvalidConfig(
                "reap_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }
}
