//! Channel name to subscriber set.

use super::subscription::Subscription;
use crate::types::{Sequence, SubscriptionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Subscribers of one channel plus its publish sequence.
#[derive(Debug, Default)]
pub struct ChannelEntry {
    /// In registration order.
    subscribers: Vec<Arc<Subscription>>,
    /// Held for the whole fan-out so publishes on a channel are totally ordered.
    sequence: Mutex<Sequence>,
}

impl ChannelEntry {
    pub fn subscribers(&self) -> &[Arc<Subscription>] {
        &self.subscribers
    }

    pub(crate) fn publish_lock(&self) -> parking_lot::MutexGuard<'_, Sequence> {
        self.sequence.lock()
    }

    /// Last sequence handed out on this channel.
    pub fn last_sequence(&self) -> Sequence {
        *self.sequence.lock()
    }
}

/// Index of subscriptions by channel.
///
/// A channel exists here only while it has at least one subscriber.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: HashMap<String, ChannelEntry>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription under its channel, creating the entry on first use.
    pub fn insert(&mut self, subscription: Arc<Subscription>) {
        self.channels
            .entry(subscription.channel().to_string())
            .or_default()
            .subscribers
            .push(subscription);
    }

    /// Remove a subscription. Empty channels are dropped.
    pub fn remove(&mut self, channel: &str, id: SubscriptionId) -> bool {
        let Some(entry) = self.channels.get_mut(channel) else {
            return false;
        };

        let before = entry.subscribers.len();
        entry.subscribers.retain(|s| s.id() != id);
        let removed = entry.subscribers.len() != before;

        if entry.subscribers.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelEntry> {
        self.channels.get(channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channel names, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }
}
