//! Main PubSub struct tying all components together.

use crate::config::PubSubConfig;
use crate::error::{PubSubError, Result};
use crate::filter::Predicate;
use crate::poll::{self, PollResult};
use crate::projection::Projection;
use crate::publish;
use crate::registry::SubscriptionRegistry;
use crate::types::{Document, PubSubStats, PublishReceipt, SubscriptionId, SubscriptionInfo};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The pub/sub broker.
///
/// Provides a unified interface for:
/// - Registering and removing subscriptions
/// - Publishing documents onto channels
/// - Polling (draining) subscription queues
/// - Reaping subscriptions nobody polls
///
/// One broker is created at service start and owned by the service; dropping
/// it discards every subscription and queued message.
pub struct PubSub {
    /// Broker configuration.
    config: PubSubConfig,

    /// All subscriptions and the channel directory.
    registry: SubscriptionRegistry,
}

impl PubSub {
    /// Create a broker after validating the configuration.
    pub fn new(config: PubSubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: SubscriptionRegistry::new(),
        })
    }

    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(PubSubError::Disabled)
        }
    }

    // --- Subscriptions ---

    /// Subscribe using the wire shapes for filter and projection.
    ///
    /// Both are validated before anything is registered; a bad filter or
    /// projection leaves the broker untouched.
    pub fn subscribe(
        &self,
        channel: &str,
        filter: Option<&Value>,
        projection: Option<&Value>,
    ) -> Result<SubscriptionId> {
        self.ensure_enabled()?;
        let filter = Predicate::parse_optional(filter)?;
        let projection = Projection::parse_optional(projection)?;
        self.subscribe_with(channel, filter, projection)
    }

    /// Subscribe with a prebuilt filter and projection.
    pub fn subscribe_with(
        &self,
        channel: &str,
        filter: Option<Predicate>,
        projection: Option<Projection>,
    ) -> Result<SubscriptionId> {
        self.ensure_enabled()?;

        let has_filter = filter.is_some();
        let has_projection = projection.is_some();
        let id = self.registry.register(
            channel,
            filter,
            projection,
            self.config.queue_capacity,
            self.config.overflow_policy,
        )?;

        debug!(
            subscription_id = %id,
            channel,
            has_filter,
            has_projection,
            "subscription created"
        );

        Ok(id)
    }

    /// Unsubscribe and discard anything still queued.
    ///
    /// A second call for the same id returns `SubscriptionNotFound`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.ensure_enabled()?;
        let removed = self.registry.remove(id)?;

        debug!(
            subscription_id = %id,
            channel = removed.channel(),
            "subscription removed"
        );

        Ok(())
    }

    // --- Publishing ---

    /// Publish a document to every subscription on `channel`.
    ///
    /// Publishing to a channel nobody subscribes to succeeds and does nothing.
    pub fn publish(&self, channel: &str, document: Document) -> Result<PublishReceipt> {
        self.ensure_enabled()?;
        if channel.is_empty() {
            return Err(PubSubError::InvalidChannel(
                "channel name must not be empty".to_string(),
            ));
        }

        let receipt = {
            let state = self.registry.read();
            publish::fan_out(&state, channel, Arc::new(document))
        };

        trace!(
            channel,
            sequence = ?receipt.sequence,
            evaluated = receipt.evaluated,
            delivered = receipt.delivered,
            "published message"
        );

        if receipt.dropped > 0 {
            warn!(
                channel,
                dropped = receipt.dropped,
                policy = ?self.config.overflow_policy,
                "subscription queue overflow"
            );
        }

        // Remove slow subscribers
        if !receipt.closed.is_empty() {
            for subscription in self.registry.remove_all(&receipt.closed) {
                warn!(
                    subscription_id = %subscription.id(),
                    channel = subscription.channel(),
                    "subscription dropped after queue overflow"
                );
            }
        }

        Ok(receipt)
    }

    /// Publish a JSON value, which must be a document.
    pub fn publish_value(&self, channel: &str, message: Value) -> Result<PublishReceipt> {
        match message {
            Value::Object(document) => self.publish(channel, document),
            other => Err(PubSubError::InvalidCommand(format!(
                "message must be a document, got {}",
                other
            ))),
        }
    }

    // --- Polling ---

    /// Drain the queues of the given subscriptions without blocking.
    ///
    /// Unknown ids are reported in `errors`; the rest are still drained.
    pub fn poll(&self, ids: &[SubscriptionId]) -> Result<PollResult> {
        self.ensure_enabled()?;

        let result = {
            let state = self.registry.read();
            poll::drain(&state, ids)
        };

        trace!(
            requested = ids.len(),
            drained = result.message_count(),
            errors = result.errors.len(),
            "poll complete"
        );

        Ok(result)
    }

    // --- Maintenance ---

    /// Remove subscriptions not polled within the idle timeout.
    pub fn reap_idle(&self) -> Vec<SubscriptionId> {
        let Some(timeout) = self.config.idle_timeout() else {
            return Vec::new();
        };

        let reaped: Vec<SubscriptionId> = self
            .registry
            .remove_idle(timeout)
            .iter()
            .map(|s| s.id())
            .collect();

        for id in &reaped {
            warn!(subscription_id = %id, ?timeout, "reaped idle subscription");
        }

        reaped
    }

    /// Drop every subscription. Returns how many were removed.
    pub fn shutdown(&self) -> usize {
        let removed = self.registry.clear();
        debug!(removed, "pub/sub shut down");
        removed
    }

    // --- Introspection ---

    pub fn subscription_info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.registry.info(id)
    }

    /// Ids subscribed to a channel, in registration order.
    pub fn subscriptions_for_channel(&self, channel: &str) -> Vec<SubscriptionId> {
        self.registry.subscriptions_for_channel(channel)
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }

    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Channels with at least one subscriber, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.registry.channel_names()
    }

    pub fn stats(&self) -> PubSubStats {
        let state = self.registry.read();
        PubSubStats {
            subscription_count: state.subscriptions.len(),
            channel_count: state.directory().channel_count(),
            queued_messages: state.subscriptions.values().map(|s| s.queued()).sum(),
        }
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self {
            config: PubSubConfig::default(),
            registry: SubscriptionRegistry::new(),
        }
    }
}
