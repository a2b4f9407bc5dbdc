//! Id-indexed subscription registry.

use super::directory::ChannelDirectory;
use super::subscription::Subscription;
use crate::config::OverflowPolicy;
use crate::error::{PubSubError, Result};
use crate::filter::Predicate;
use crate::projection::Projection;
use crate::types::{SubscriptionId, SubscriptionInfo};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything guarded by the registry lock.
#[derive(Debug, Default)]
pub struct RegistryState {
    /// Active subscriptions by ID.
    pub(crate) subscriptions: HashMap<SubscriptionId, Arc<Subscription>>,
    /// Same subscriptions grouped by channel.
    pub(crate) directory: ChannelDirectory,
}

impl RegistryState {
    pub fn get(&self, id: SubscriptionId) -> Option<&Arc<Subscription>> {
        self.subscriptions.get(&id)
    }

    pub fn directory(&self) -> &ChannelDirectory {
        &self.directory
    }

    /// Unlink from both indexes. The queue is left for the caller to
    /// discard once the write lock is released.
    fn remove(&mut self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        let subscription = self.subscriptions.remove(&id)?;
        self.directory.remove(subscription.channel(), id);
        Some(subscription)
    }
}

fn close_all(removed: &[Arc<Subscription>]) {
    for subscription in removed {
        subscription.close();
    }
}

/// Owns all subscriptions.
///
/// Subscribe and unsubscribe take the write lock; publish and poll run under
/// the read lock, so a subscription is never added or removed mid fan-out.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscription with an already-validated filter and projection.
    pub fn register(
        &self,
        channel: &str,
        filter: Option<Predicate>,
        projection: Option<Projection>,
        capacity: Option<usize>,
        policy: OverflowPolicy,
    ) -> Result<SubscriptionId> {
        if channel.is_empty() {
            return Err(PubSubError::InvalidChannel(
                "channel name must not be empty".to_string(),
            ));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let subscription = Arc::new(Subscription::new(
            id, channel, filter, projection, capacity, policy,
        ));

        let mut state = self.state.write();
        let previous = state.subscriptions.insert(id, Arc::clone(&subscription));
        assert!(previous.is_none(), "duplicate subscription id {}", id);
        state.directory.insert(subscription);

        Ok(id)
    }

    /// Remove from both indexes and discard the queue.
    pub fn remove(&self, id: SubscriptionId) -> Result<Arc<Subscription>> {
        let removed = self.state.write().remove(id);
        let subscription = removed.ok_or(PubSubError::SubscriptionNotFound(id))?;
        subscription.close();
        Ok(subscription)
    }

    /// Remove several subscriptions at once, skipping unknown ids.
    pub fn remove_all(&self, ids: &[SubscriptionId]) -> Vec<Arc<Subscription>> {
        let removed: Vec<_> = {
            let mut state = self.state.write();
            ids.iter().filter_map(|id| state.remove(*id)).collect()
        };
        close_all(&removed);
        removed
    }

    /// Remove every subscription idle for at least `timeout`.
    pub fn remove_idle(&self, timeout: Duration) -> Vec<Arc<Subscription>> {
        let now = Instant::now();
        let removed: Vec<_> = {
            let mut state = self.state.write();
            let idle: Vec<SubscriptionId> = state
                .subscriptions
                .values()
                .filter(|s| s.idle_for(now) >= timeout)
                .map(|s| s.id())
                .collect();
            idle.into_iter().filter_map(|id| state.remove(id)).collect()
        };
        close_all(&removed);
        removed
    }

    /// Remove everything.
    pub fn clear(&self) -> usize {
        let removed: Vec<_> = {
            let mut state = self.state.write();
            let ids: Vec<SubscriptionId> = state.subscriptions.keys().copied().collect();
            ids.into_iter().filter_map(|id| state.remove(id)).collect()
        };
        close_all(&removed);
        removed.len()
    }

    /// Shared access for fan-out and drain.
    pub fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.state.read().subscriptions.contains_key(&id)
    }

    pub fn info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.state.read().get(id).map(|s| s.info())
    }

    /// Ids registered on a channel, in registration order.
    pub fn subscriptions_for_channel(&self, channel: &str) -> Vec<SubscriptionId> {
        self.state
            .read()
            .directory
            .get(channel)
            .map(|entry| entry.subscribers().iter().map(|s| s.id()).collect())
            .unwrap_or_default()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.read().subscriptions.len()
    }

    pub fn channel_count(&self) -> usize {
        self.state.read().directory.channel_count()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.state.read().directory.channel_names()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
