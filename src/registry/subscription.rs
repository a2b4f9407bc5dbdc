//! A single registered subscription.

use crate::config::OverflowPolicy;
use crate::filter::{self, Predicate};
use crate::projection::{self, Projection};
use crate::queue::{MessageQueue, PushOutcome};
use crate::types::{Document, Message, Sequence, SubscriptionId, SubscriptionInfo, Timestamp};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Internal subscription state.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    channel: Arc<str>,
    filter: Option<Predicate>,
    projection: Option<Projection>,
    /// Append by publish, drain by poll; never held across subscriptions.
    queue: Mutex<MessageQueue>,
    created: Timestamp,
    /// Last subscribe or poll, for idle reaping.
    last_active: Mutex<Instant>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        channel: &str,
        filter: Option<Predicate>,
        projection: Option<Projection>,
        capacity: Option<usize>,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            id,
            channel: Arc::from(channel),
            filter,
            projection,
            queue: Mutex::new(MessageQueue::new(capacity, policy)),
            created: Timestamp::now(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Check if this subscription wants a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self.filter {
            Some(ref predicate) => filter::matches(predicate, document),
            None => true,
        }
    }

    /// Filter, project and enqueue. Returns `None` when the filter rejects.
    pub(crate) fn offer(
        &self,
        document: &Arc<Document>,
        sequence: Sequence,
        published_at: Timestamp,
    ) -> Option<PushOutcome> {
        if !self.matches(document) {
            return None;
        }

        let message = Message {
            channel: Arc::clone(&self.channel),
            sequence,
            published_at,
            document: projection::project(self.projection.as_ref(), document),
        };

        Some(self.queue.lock().push(message))
    }

    /// Take everything queued and mark the subscription as active.
    pub(crate) fn drain(&self) -> VecDeque<Message> {
        self.touch();
        self.queue.lock().drain()
    }

    /// Drop undrained messages when the subscription closes.
    pub(crate) fn close(&self) {
        self.queue.lock().clear();
    }

    pub(crate) fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// Time since the last subscribe or poll.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_active.lock())
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn info(&self) -> SubscriptionInfo {
        let queue = self.queue.lock();
        SubscriptionInfo {
            id: self.id,
            channel: self.channel.to_string(),
            has_filter: self.filter.is_some(),
            has_projection: self.projection.is_some(),
            queued: queue.len(),
            dropped: queue.dropped(),
            created: self.created,
        }
    }
}
