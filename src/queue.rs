//! Per-subscription delivery queue.

use crate::config::OverflowPolicy;
use crate::types::Message;
use std::collections::VecDeque;

/// What happened when a message was pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended with room to spare.
    Queued,
    /// Appended after evicting the oldest message.
    EvictedOldest,
    /// Not appended; the queue kept its contents.
    Refused,
    /// Not appended; the subscription should be closed.
    Overflowed,
}

impl PushOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self, PushOutcome::Queued | PushOutcome::EvictedOldest)
    }
}

/// FIFO of messages awaiting a poll, optionally bounded.
#[derive(Debug)]
pub struct MessageQueue {
    items: VecDeque<Message>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    /// Messages lost to the overflow policy over the queue's lifetime.
    dropped: u64,
}

impl MessageQueue {
    pub fn new(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            policy,
            dropped: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, OverflowPolicy::default())
    }

    /// Append a message, applying the overflow policy when full.
    pub fn push(&mut self, message: Message) -> PushOutcome {
        let full = self.capacity.is_some_and(|cap| self.items.len() >= cap);
        if !full {
            self.items.push_back(message);
            return PushOutcome::Queued;
        }

        self.dropped += 1;
        match self.policy {
            OverflowPolicy::DropOldest => {
                self.items.pop_front();
                self.items.push_back(message);
                PushOutcome::EvictedOldest
            }
            OverflowPolicy::DropNewest => PushOutcome::Refused,
            OverflowPolicy::DropSubscriber => PushOutcome::Overflowed,
        }
    }

    /// Swap the contents out for an empty queue.
    pub fn drain(&mut self) -> VecDeque<Message> {
        std::mem::take(&mut self.items)
    }

    /// Discard everything queued.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
