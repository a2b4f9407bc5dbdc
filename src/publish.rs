//! Fan-out of a published document to a channel's subscriptions.

use crate::queue::PushOutcome;
use crate::registry::RegistryState;
use crate::types::{Document, PublishReceipt, Timestamp};
use std::sync::Arc;

/// Offer `document` to every subscription on `channel`.
///
/// Must run under the registry read lock. The channel's publish lock is held
/// for the whole loop, so every subscriber sees publishes in the same order.
/// Subscriptions that overflowed under `DropSubscriber` are reported in
/// `closed`; removing them is the caller's job.
pub fn fan_out(state: &RegistryState, channel: &str, document: Arc<Document>) -> PublishReceipt {
    let Some(entry) = state.directory().get(channel) else {
        return PublishReceipt::default();
    };

    let mut sequence = entry.publish_lock();
    *sequence = sequence.next();
    let published_at = Timestamp::now();

    let mut receipt = PublishReceipt {
        sequence: Some(*sequence),
        ..Default::default()
    };

    for subscription in entry.subscribers() {
        receipt.evaluated += 1;
        match subscription.offer(&document, *sequence, published_at) {
            None => {}
            Some(PushOutcome::Queued) => receipt.delivered += 1,
            Some(PushOutcome::EvictedOldest) => {
                receipt.delivered += 1;
                receipt.dropped += 1;
            }
            Some(PushOutcome::Refused) => receipt.dropped += 1,
            Some(PushOutcome::Overflowed) => {
                receipt.dropped += 1;
                receipt.closed.push(subscription.id());
            }
        }
    }

    receipt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::filter::Predicate;
    use crate::projection::Projection;
    use crate::registry::SubscriptionRegistry;
    use crate::types::{Sequence, SubscriptionId};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Arc<Document> {
        match value {
            Value::Object(map) => Arc::new(map),
            _ => panic!("not an object"),
        }
    }

    fn register(
        registry: &SubscriptionRegistry,
        filter: Option<Value>,
        projection: Option<Value>,
    ) -> SubscriptionId {
        registry
            .register(
                "A",
                Predicate::parse_optional(filter.as_ref()).unwrap(),
                Projection::parse_optional(projection.as_ref()).unwrap(),
                None,
                OverflowPolicy::DropOldest,
            )
            .unwrap()
    }

    #[test]
    fn test_no_subscribers_is_noop() {
        let registry = SubscriptionRegistry::new();
        let receipt = fan_out(&registry.read(), "A", doc(json!({"a": 1})));
        assert_eq!(receipt, PublishReceipt::default());
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn test_fan_out_counts() {
        let registry = SubscriptionRegistry::new();
        let plain = register(&registry, None, None);
        let filtered = register(&registry, Some(json!({"count": {"gt": 3}})), None);

        let receipt = fan_out(&registry.read(), "A", doc(json!({"count": 1})));
        assert_eq!(receipt.sequence, Some(Sequence(1)));
        assert_eq!(receipt.evaluated, 2);
        assert_eq!(receipt.delivered, 1);

        let receipt = fan_out(&registry.read(), "A", doc(json!({"count": 5})));
        assert_eq!(receipt.sequence, Some(Sequence(2)));
        assert_eq!(receipt.delivered, 2);

        let state = registry.read();
        assert_eq!(state.get(plain).unwrap().queued(), 2);
        assert_eq!(state.get(filtered).unwrap().queued(), 1);
    }

    #[test]
    fn test_unprojected_subscribers_share_document() {
        let registry = SubscriptionRegistry::new();
        let a = register(&registry, None, None);
        let b = register(&registry, None, None);

        fan_out(&registry.read(), "A", doc(json!({"a": 1})));

        let state = registry.read();
        let first = state.get(a).unwrap().drain();
        let second = state.get(b).unwrap().drain();
        assert!(Arc::ptr_eq(&first[0].document, &second[0].document));
    }

    #[test]
    fn test_drop_subscriber_reported() {
        let registry = SubscriptionRegistry::new();
        let id = registry
            .register("A", None, None, Some(1), OverflowPolicy::DropSubscriber)
            .unwrap();

        fan_out(&registry.read(), "A", doc(json!({"n": 1})));
        let receipt = fan_out(&registry.read(), "A", doc(json!({"n": 2})));
        assert_eq!(receipt.closed, vec![id]);
        assert_eq!(receipt.dropped, 1);
        assert_eq!(receipt.delivered, 0);
    }
}
